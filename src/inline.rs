//! Collapsing a multi-page site into one self-contained `index.html`.
//!
//! Every partial under `partials/` is embedded into the index page as an inert
//! template block, keyed by its path relative to the index:
//!
//! ```html
//! <body ...><script type="text/ng-template" id="partials/api/ng.filter.html">...</script>
//! ```
//!
//! and the partial files are deleted afterwards. Running the pass a second
//! time therefore fails: there is nothing left to inline.
//!
//! ## Embedding
//!
//! A partial may itself contain `</script>` (code examples do), which would
//! end the template block early. [`FragmentCodec`] swaps it for a placeholder
//! before embedding; a bootstrap script appended after the templates swaps it
//! back when the page loads, once per template block, and leaves ordinary
//! scripts alone.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum InlineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("No partials found under {0} (already inlined?)")]
    NoPartials(PathBuf),
    #[error("No <body> tag in {0}")]
    NoBody(PathBuf),
}

static BODY_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<body[^>]*>").unwrap());

/// Script type of the inert template blocks.
pub const TEMPLATE_TYPE: &str = "text/ng-template";

/// Escapes fragments for embedding inside a `<script>` block, and back.
///
/// `decode(encode(s)) == s` for any `s` that does not already contain the
/// placeholder.
pub struct FragmentCodec;

impl FragmentCodec {
    pub const TERMINATOR: &'static str = "</script>";
    pub const PLACEHOLDER: &'static str = "<___/script___>";

    pub fn encode(fragment: &str) -> String {
        fragment.replace(Self::TERMINATOR, Self::PLACEHOLDER)
    }

    pub fn decode(embedded: &str) -> String {
        embedded.replace(Self::PLACEHOLDER, Self::TERMINATOR)
    }

    /// Load-time counterpart of [`FragmentCodec::decode`], run by the browser.
    pub fn bootstrap() -> String {
        format!(
            "<script>(function(){{\
var s=document.getElementsByTagName('script');\
for(var i=0;i<s.length;i++){{\
if(s[i].type==='{TEMPLATE_TYPE}'){{\
s[i].innerHTML=s[i].innerHTML.split('{placeholder}').join('<'+'/script>');\
}}}}}})()</script>",
            placeholder = Self::PLACEHOLDER,
        )
    }
}

/// Wrap one encoded partial into its template block.
fn template_block(key: &str, content: &str) -> String {
    let id = maud::html! { (key) }.into_string();
    format!(
        "<script type=\"{TEMPLATE_TYPE}\" id=\"{id}\">{}</script>",
        FragmentCodec::encode(content)
    )
}

/// Partial files under `partials_dir`, sorted, as (relative key, path).
fn collect_partials(
    index_dir: &Path,
    partials_dir: &Path,
) -> Result<Vec<(String, PathBuf)>, InlineError> {
    let mut partials = Vec::new();
    for entry in WalkDir::new(partials_dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|e| e != "html") {
            continue;
        }
        let rel = path.strip_prefix(index_dir).unwrap_or(path);
        let key = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        partials.push((key, path.to_path_buf()));
    }
    Ok(partials)
}

/// Summary of an inlining pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineReport {
    pub index_file: PathBuf,
    pub partials: Vec<String>,
}

/// Embed every partial into `index_file` and delete the partial files.
///
/// Fails when `partials_dir` is missing or holds no partials, so a second
/// pass over an already inlined site is an error rather than a no-op.
pub fn inline_partials(index_file: &Path, partials_dir: &Path) -> Result<InlineReport, InlineError> {
    if !partials_dir.is_dir() {
        return Err(InlineError::NoPartials(partials_dir.to_path_buf()));
    }
    let index_dir = index_file.parent().unwrap_or(Path::new(""));
    let partials = collect_partials(index_dir, partials_dir)?;
    if partials.is_empty() {
        return Err(InlineError::NoPartials(partials_dir.to_path_buf()));
    }

    let mut blocks = String::new();
    for (key, path) in &partials {
        let content = fs::read_to_string(path)?;
        blocks.push_str(&template_block(key, &content));
    }
    blocks.push_str(&FragmentCodec::bootstrap());

    let index = fs::read_to_string(index_file)?;
    let body = BODY_OPEN
        .find(&index)
        .ok_or_else(|| InlineError::NoBody(index_file.to_path_buf()))?;
    let mut patched = String::with_capacity(index.len() + blocks.len());
    patched.push_str(&index[..body.end()]);
    patched.push_str(&blocks);
    patched.push_str(&index[body.end()..]);
    fs::write(index_file, patched)?;

    for (_, path) in &partials {
        fs::remove_file(path)?;
    }

    tracing::info!(
        index = %index_file.display(),
        partials = partials.len(),
        "Inlined partials"
    );
    Ok(InlineReport {
        index_file: index_file.to_path_buf(),
        partials: partials.into_iter().map(|(key, _)| key).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site(partials: &[(&str, &str)]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("index.html"),
            "<html><head><script src=\"a.js\"></script></head><BODY class=\"docs\" data-x=\"1\"><main></main></BODY></html>",
        )
        .unwrap();
        for (rel, content) in partials {
            let path = tmp.path().join("partials").join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        tmp
    }

    /// Extract the content of the template block with the given id.
    fn template_content<'a>(html: &'a str, id: &str) -> &'a str {
        let open = format!("<script type=\"{TEMPLATE_TYPE}\" id=\"{id}\">");
        let start = html.find(&open).unwrap() + open.len();
        let len = html[start..].find("</script>").unwrap();
        &html[start..start + len]
    }

    #[test]
    fn codec_roundtrip() {
        let fragment = "<pre>&lt;script&gt;</pre><script>alert(1)</script><p>after</p>";
        let encoded = FragmentCodec::encode(fragment);
        assert!(!encoded.contains("</script>"));
        assert_eq!(FragmentCodec::decode(&encoded), fragment);
    }

    #[test]
    fn fragment_with_terminator_survives_embedding() {
        let fragment = "<p>Example:</p><script>var x = 1;</script><p>end</p>";
        let tmp = site(&[("api/a.html", fragment)]);
        inline_partials(&tmp.path().join("index.html"), &tmp.path().join("partials")).unwrap();

        let html = fs::read_to_string(tmp.path().join("index.html")).unwrap();
        let embedded = template_content(&html, "partials/api/a.html");
        assert_eq!(FragmentCodec::decode(embedded), fragment);
    }

    #[test]
    fn blocks_inserted_after_body_with_attributes() {
        let tmp = site(&[("api/a.html", "<h1>A</h1>")]);
        inline_partials(&tmp.path().join("index.html"), &tmp.path().join("partials")).unwrap();

        let html = fs::read_to_string(tmp.path().join("index.html")).unwrap();
        assert!(html.contains(
            "<BODY class=\"docs\" data-x=\"1\"><script type=\"text/ng-template\" id=\"partials/api/a.html\"><h1>A</h1></script>"
        ));
        assert!(html.ends_with("<main></main></BODY></html>"));
        // head scripts untouched
        assert!(html.starts_with("<html><head><script src=\"a.js\"></script></head>"));
    }

    #[test]
    fn partials_sorted_and_keyed_by_relative_path() {
        let tmp = site(&[
            ("guide/b.html", "b"),
            ("api/z.html", "z"),
            ("api/a.html", "a"),
            ("api/notes.txt", "ignored"),
        ]);
        let report =
            inline_partials(&tmp.path().join("index.html"), &tmp.path().join("partials")).unwrap();
        assert_eq!(
            report.partials,
            vec!["partials/api/a.html", "partials/api/z.html", "partials/guide/b.html"]
        );
        assert!(tmp.path().join("partials/api/notes.txt").exists());
    }

    #[test]
    fn partial_files_deleted() {
        let tmp = site(&[("api/a.html", "a"), ("todo/index.html", "t")]);
        inline_partials(&tmp.path().join("index.html"), &tmp.path().join("partials")).unwrap();
        assert!(!tmp.path().join("partials/api/a.html").exists());
        assert!(!tmp.path().join("partials/todo/index.html").exists());
    }

    #[test]
    fn second_pass_fails() {
        let tmp = site(&[("api/a.html", "a")]);
        let index = tmp.path().join("index.html");
        let partials = tmp.path().join("partials");
        inline_partials(&index, &partials).unwrap();
        let before = fs::read_to_string(&index).unwrap();

        let err = inline_partials(&index, &partials).unwrap_err();
        assert!(matches!(err, InlineError::NoPartials(_)));
        assert_eq!(fs::read_to_string(&index).unwrap(), before);
    }

    #[test]
    fn missing_partials_dir_fails() {
        let tmp = site(&[]);
        let err =
            inline_partials(&tmp.path().join("index.html"), &tmp.path().join("partials")).unwrap_err();
        assert!(matches!(err, InlineError::NoPartials(_)));
    }

    #[test]
    fn index_without_body_fails_and_keeps_partials() {
        let tmp = site(&[("api/a.html", "a")]);
        fs::write(tmp.path().join("index.html"), "<html></html>").unwrap();
        let err =
            inline_partials(&tmp.path().join("index.html"), &tmp.path().join("partials")).unwrap_err();
        assert!(matches!(err, InlineError::NoBody(_)));
        assert!(tmp.path().join("partials/api/a.html").exists());
    }

    #[test]
    fn bootstrap_only_targets_template_blocks() {
        let js = FragmentCodec::bootstrap();
        assert!(js.contains("type==='text/ng-template'"));
        assert!(js.contains("<___/script___>"));
        // the bootstrap must not terminate its own block early
        assert_eq!(js.matches("</script>").count(), 1);
        assert!(js.ends_with("</script>"));
    }

    #[test]
    fn template_id_is_escaped() {
        let block = template_block("partials/a\"b.html", "x");
        assert!(block.contains("id=\"partials/a&quot;b.html\""));
    }
}
