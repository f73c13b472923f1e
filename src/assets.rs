//! Static files of the generated site.
//!
//! Two jobs:
//!
//! - **Seeding the shell** on the first build into a destination: the bundled
//!   stylesheet and loader script, plus every file of a user-provided shell
//!   directory (`shell` in the config) copied over them.
//! - **Copying user assets** named in `scripts`, `styles` and `image` into the
//!   destination, and returning the paths `index.html` must reference.
//!
//! Remote urls and paths leaving the site (`../`) are referenced as-is:
//!
//! ```text
//! angular.js                   → js/angular.min.js      (shipped by the shell)
//! https://cdn/x.js             → https://cdn/x.js
//! vendor/lib/foo.js            → grunt-scripts/foo.js   (copied)
//! theme/site.css               → css/site.css           (copied)
//! img/logo.png                 → grunt-styles/img/logo.png (copied)
//! /srv/brand/logo.png          → grunt-styles/srv/brand/logo.png (copied)
//! ```

use regex::Regex;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("cannot copy {path}: {source}")]
    Copy { path: PathBuf, source: io::Error },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

pub const SCRIPTS_DIR: &str = "grunt-scripts";
pub const IMAGES_DIR: &str = "grunt-styles";
pub const STYLES_DIR: &str = "css";

const SHELL_CSS: &str = include_str!("../static/css/docs.css");
const SHELL_JS: &str = include_str!("../static/js/docs.js");

static LINKED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^((https?:)?//|\.\./)").unwrap());

/// Whether an asset path points outside the site and is used verbatim.
pub fn is_linked(path: &str) -> bool {
    LINKED.is_match(path)
}

/// Asset references, as `index.html` should load them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteAssets {
    pub scripts: Vec<String>,
    pub styles: Vec<String>,
    pub image: Option<String>,
}

fn copy_file(src: &Path, dst: &Path) -> Result<(), AssetError> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    // copying a file onto itself truncates it
    if let (Ok(from), Ok(to)) = (src.canonicalize(), dst.canonicalize())
        && from == to
    {
        tracing::debug!(path = %src.display(), "Asset already in place");
        return Ok(());
    }
    fs::copy(src, dst).map_err(|source| AssetError::Copy {
        path: src.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// `path` without its root, prefix and `.` components, `/`-separated.
fn site_relative(path: &str) -> String {
    Path::new(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Copy local scripts, styles and image into `dest`, resolving their site paths.
pub fn copy_assets(
    dest: &Path,
    scripts: &[String],
    styles: &[String],
    image: Option<&str>,
) -> Result<SiteAssets, AssetError> {
    let mut assets = SiteAssets::default();

    for script in scripts {
        let site_path = if script == "angular.js" {
            "js/angular.min.js".to_string()
        } else if is_linked(script) {
            script.clone()
        } else {
            let name = file_name(script);
            copy_file(Path::new(script), &dest.join(SCRIPTS_DIR).join(name))?;
            format!("{SCRIPTS_DIR}/{name}")
        };
        assets.scripts.push(site_path);
    }

    for style in styles {
        let site_path = if is_linked(style) {
            style.clone()
        } else {
            let name = file_name(style);
            copy_file(Path::new(style), &dest.join(STYLES_DIR).join(name))?;
            format!("{STYLES_DIR}/{name}")
        };
        assets.styles.push(site_path);
    }

    assets.image = match image {
        Some(img) if !is_linked(img) => {
            let rel = site_relative(img);
            copy_file(Path::new(img), &dest.join(IMAGES_DIR).join(&rel))?;
            Some(format!("{IMAGES_DIR}/{rel}"))
        }
        other => other.map(str::to_string),
    };

    Ok(assets)
}

/// Seed a fresh destination with the site shell.
///
/// The bundled stylesheet and loader go first, so a user shell can override
/// them. Template files (`*.tmpl`) in the user shell are not copied.
pub fn seed_shell(dest: &Path, shell: Option<&Path>) -> Result<usize, AssetError> {
    fs::create_dir_all(dest.join("css"))?;
    fs::create_dir_all(dest.join("js"))?;
    fs::write(dest.join("css/docs.css"), SHELL_CSS)?;
    fs::write(dest.join("js/docs.js"), SHELL_JS)?;
    let mut copied = 2;

    if let Some(shell) = shell {
        for entry in WalkDir::new(shell).sort_by_file_name() {
            let entry = entry?;
            let Ok(rel) = entry.path().strip_prefix(shell) else {
                continue;
            };
            if entry.file_type().is_dir() {
                fs::create_dir_all(dest.join(rel))?;
            } else if entry.path().extension().is_none_or(|e| e != "tmpl") {
                copy_file(entry.path(), &dest.join(rel))?;
                copied += 1;
            }
        }
    }

    tracing::debug!(dest = %dest.display(), files = copied, "Seeded site shell");
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn linked_paths() {
        assert!(is_linked("https://cdn.example.com/a.js"));
        assert!(is_linked("http://cdn.example.com/a.js"));
        assert!(is_linked("//cdn.example.com/a.js"));
        assert!(is_linked("../shared/a.js"));
        assert!(!is_linked("lib/a.js"));
        assert!(!is_linked("a.js"));
    }

    #[test]
    fn remote_assets_untouched() {
        let tmp = TempDir::new().unwrap();
        let assets = copy_assets(
            tmp.path(),
            &["angular.js".into(), "https://cdn/x.js".into()],
            &["//cdn/x.css".into()],
            Some("https://cdn/logo.png"),
        )
        .unwrap();
        assert_eq!(assets.scripts, vec!["js/angular.min.js", "https://cdn/x.js"]);
        assert_eq!(assets.styles, vec!["//cdn/x.css"]);
        assert_eq!(assets.image.as_deref(), Some("https://cdn/logo.png"));
    }

    #[test]
    fn local_assets_copied() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let script = src.path().join("lib/foo.js");
        let style = src.path().join("theme/site.css");
        fs::create_dir_all(script.parent().unwrap()).unwrap();
        fs::create_dir_all(style.parent().unwrap()).unwrap();
        fs::write(&script, "var foo;").unwrap();
        fs::write(&style, "body{}").unwrap();

        let assets = copy_assets(
            dest.path(),
            &[script.to_string_lossy().into_owned()],
            &[style.to_string_lossy().into_owned()],
            None,
        )
        .unwrap();

        assert_eq!(assets.scripts, vec!["grunt-scripts/foo.js"]);
        assert_eq!(assets.styles, vec!["css/site.css"]);
        assert_eq!(
            fs::read_to_string(dest.path().join("grunt-scripts/foo.js")).unwrap(),
            "var foo;"
        );
        assert!(dest.path().join("css/site.css").exists());
    }

    #[test]
    fn relative_image_keeps_its_directories() {
        assert_eq!(site_relative("img/logo.png"), "img/logo.png");
        assert_eq!(site_relative("./img/logo.png"), "img/logo.png");
        assert_eq!(site_relative("/abs/img/logo.png"), "abs/img/logo.png");
    }

    #[test]
    fn absolute_image_copied_into_dest() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let logo = src.path().join("logo.png");
        fs::write(&logo, "PNGDATA").unwrap();
        let logo_str = logo.to_string_lossy().into_owned();

        let assets = copy_assets(dest.path(), &[], &[], Some(&logo_str)).unwrap();

        let rel = site_relative(&logo_str);
        assert_eq!(assets.image, Some(format!("grunt-styles/{rel}")));
        assert!(!assets.image.as_deref().unwrap().contains("//"));
        // source left intact, copy lands under dest
        assert_eq!(fs::read_to_string(&logo).unwrap(), "PNGDATA");
        assert_eq!(
            fs::read_to_string(dest.path().join("grunt-styles").join(&rel)).unwrap(),
            "PNGDATA"
        );
    }

    #[test]
    fn asset_already_in_dest_is_not_truncated() {
        let dest = TempDir::new().unwrap();
        let script = dest.path().join("grunt-scripts/foo.js");
        fs::create_dir_all(script.parent().unwrap()).unwrap();
        fs::write(&script, "var foo;").unwrap();

        copy_assets(dest.path(), &[script.to_string_lossy().into_owned()], &[], None).unwrap();
        assert_eq!(fs::read_to_string(&script).unwrap(), "var foo;");
    }

    #[test]
    fn missing_local_asset_is_error() {
        let dest = TempDir::new().unwrap();
        let err = copy_assets(dest.path(), &["does/not/exist.js".into()], &[], None).unwrap_err();
        assert!(matches!(err, AssetError::Copy { .. }));
    }

    #[test]
    fn seed_shell_writes_bundled_files() {
        let dest = TempDir::new().unwrap();
        let copied = seed_shell(dest.path(), None).unwrap();
        assert_eq!(copied, 2);
        assert!(dest.path().join("css/docs.css").exists());
        assert!(dest.path().join("js/docs.js").exists());
    }

    #[test]
    fn seed_shell_copies_user_shell_except_templates() {
        let shell = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::create_dir_all(shell.path().join("js")).unwrap();
        fs::write(shell.path().join("js/angular.min.js"), "angular").unwrap();
        fs::write(shell.path().join("js/docs.js"), "custom").unwrap();
        fs::write(shell.path().join("index.tmpl"), "<html>").unwrap();

        let copied = seed_shell(dest.path(), Some(shell.path())).unwrap();
        assert_eq!(copied, 4);
        assert!(dest.path().join("js/angular.min.js").exists());
        assert!(!dest.path().join("index.tmpl").exists());
        // user shell overrides the bundled loader
        assert_eq!(
            fs::read_to_string(dest.path().join("js/docs.js")).unwrap(),
            "custom"
        );
    }
}
