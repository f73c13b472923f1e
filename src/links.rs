//! Source and edit links back to the originating repository.
//!
//! Each rendered page can carry a "View source" and an "Improve this doc" link.
//! Both come from a URL template such as
//!
//! ```text
//! https://github.com/{{repo}}/blob/{{sha}}/{{file}}#L{{codeline}}
//! ```
//!
//! The template is either given explicitly in the config, or `true` to take
//! the default of the repository host detected from the project descriptor, or
//! `false` to disable the link. A disabled link is not an error: the page is
//! simply rendered without it.
//!
//! ## Placeholders
//!
//! | Name | Value |
//! |------|-------|
//! | `repo` | `owner/name` slug extracted from the repository URL |
//! | `version` | project version, `master` when unknown |
//! | `sha` | short commit sha of `HEAD`, resolved once per run |
//! | `file`, `filepath`, `filename` | source file, its directory (`.` when none), its base name |
//! | `line`, `codeline` | line of the comment block and of the documented code |
//!
//! Link templates use `{{ name }}`; the index page template uses `<%= name %>`,
//! so link output embedded in a rendered page is never substituted twice.
//!
//! ## Commit sha
//!
//! When a template mentions `{{sha}}`, `git rev-parse HEAD` runs once per run.
//! If that fails, whatever git printed (or the OS error when git cannot be
//! started) is used in place of the sha, first seven characters. The build carries on with degraded links.

use crate::types::ProjectMeta;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("link template is empty")]
    EmptyTemplate,
    #[error("unknown placeholder {{{{{0}}}}} in link template: {1}")]
    UnknownPlaceholder(String, String),
    /// Raw stdout and stderr of the failed git call.
    #[error("git error: {0}")]
    Git(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LinkError {
    /// What the failed lookup produced, without the error's own prefix.
    pub fn raw_output(&self) -> String {
        match self {
            LinkError::Git(output) => output.clone(),
            LinkError::Io(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}

const SHA_LEN: usize = 7;
const PLACEHOLDERS: &[&str] = &[
    "repo", "version", "sha", "file", "filepath", "filename", "line", "codeline",
];

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").unwrap());

/// How a link is configured: `true`/`false` or an explicit template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkSetting {
    Enabled(bool),
    Template(String),
}

impl Default for LinkSetting {
    fn default() -> Self {
        LinkSetting::Enabled(true)
    }
}

/// A known repository host.
pub struct RepoHost {
    pub name: &'static str,
    pattern: Regex,
    suffix: Regex,
    pub source_link: &'static str,
    pub edit_link: &'static str,
}

impl RepoHost {
    /// Extract the `owner/name` slug from a remote URL, if it belongs to this host.
    pub fn repo_slug(&self, url: &str) -> Option<String> {
        let caps = self.pattern.captures(url)?;
        let raw = caps.get(1).or_else(|| caps.get(2))?.as_str();
        Some(self.suffix.replace(raw, "").into_owned())
    }
}

static HOSTS: LazyLock<Vec<RepoHost>> = LazyLock::new(|| {
    vec![RepoHost {
        name: "github",
        pattern: Regex::new(r"https?://github\.com/([^/]+/[^/]+)|git@github\.com:(.*)").unwrap(),
        suffix: Regex::new(r"\.git.*$").unwrap(),
        source_link: "https://github.com/{{repo}}/blob/{{sha}}/{{file}}#L{{codeline}}",
        edit_link: "https://github.com/{{repo}}/edit/master/{{file}}",
    }]
});

/// Find the host a remote URL belongs to, together with the repo slug.
pub fn match_host(url: &str) -> Option<(&'static RepoHost, String)> {
    HOSTS
        .iter()
        .find_map(|host| host.repo_slug(url).map(|slug| (host, slug)))
}

/// Source of the current commit sha.
pub trait CommitResolver {
    fn head_sha(&self) -> Result<String, LinkError>;
}

/// Resolves `HEAD` by shelling out to `git rev-parse`.
#[derive(Debug, Default)]
pub struct GitCommitResolver {
    /// Repository to query; the working directory when `None`.
    pub repo_dir: Option<PathBuf>,
}

impl CommitResolver for GitCommitResolver {
    fn head_sha(&self) -> Result<String, LinkError> {
        let mut cmd = Command::new("git");
        cmd.args(["rev-parse", "HEAD"]);
        if let Some(dir) = &self.repo_dir {
            cmd.current_dir(dir);
        }
        let output = cmd.output()?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(LinkError::Git(format!(
                "{}{}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            )))
        }
    }
}

/// Values a link template closes over, fixed for the whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkValues {
    pub repo: String,
    pub version: String,
    pub sha: String,
}

/// Maps `(file, line, codeline)` to a URL, or to nothing when disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkFunction {
    Disabled,
    Template {
        template: String,
        values: LinkValues,
    },
}

impl LinkFunction {
    pub fn is_enabled(&self) -> bool {
        matches!(self, LinkFunction::Template { .. })
    }

    /// Expand the template for one location. `None` means omit the link.
    pub fn url(&self, file: &str, line: Option<u32>, codeline: Option<u32>) -> Option<String> {
        let LinkFunction::Template { template, values } = self else {
            return None;
        };
        let path = Path::new(file);
        let filepath = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_string_lossy().into_owned(),
            _ => ".".to_string(),
        };
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let line = line.map(|l| l.to_string()).unwrap_or_default();
        let codeline = codeline.map(|l| l.to_string()).unwrap_or_default();

        let url = PLACEHOLDER.replace_all(template, |caps: &regex::Captures| {
            match &caps[1] {
                "repo" => values.repo.clone(),
                "version" => values.version.clone(),
                "sha" => values.sha.clone(),
                "file" => file.to_string(),
                "filepath" => filepath.clone(),
                "filename" => filename.clone(),
                "line" => line.clone(),
                "codeline" => codeline.clone(),
                // rejected when the template was built
                _ => String::new(),
            }
        });
        Some(url.into_owned())
    }
}

/// The pair of link functions a run renders pages with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLinks {
    pub source: LinkFunction,
    pub edit: LinkFunction,
}

impl SiteLinks {
    pub fn disabled() -> Self {
        Self {
            source: LinkFunction::Disabled,
            edit: LinkFunction::Disabled,
        }
    }
}

fn references_sha(template: &str) -> bool {
    PLACEHOLDER.captures_iter(template).any(|c| &c[1] == "sha")
}

fn validate_template(template: &str) -> Result<(), LinkError> {
    if template.trim().is_empty() {
        return Err(LinkError::EmptyTemplate);
    }
    for caps in PLACEHOLDER.captures_iter(template) {
        if !PLACEHOLDERS.contains(&&caps[1]) {
            return Err(LinkError::UnknownPlaceholder(
                caps[1].to_string(),
                template.to_string(),
            ));
        }
    }
    Ok(())
}

/// Truncate to the short sha length, counting characters.
fn short_sha(raw: &str) -> String {
    raw.chars().take(SHA_LEN).collect()
}

/// Builds the link functions for one run.
///
/// The commit sha is looked up lazily and at most once, even when both the
/// source and the edit template reference it.
pub struct LinkResolver<'a> {
    commits: &'a dyn CommitResolver,
    sha: OnceCell<String>,
}

impl<'a> LinkResolver<'a> {
    pub fn new(commits: &'a dyn CommitResolver) -> Self {
        Self {
            commits,
            sha: OnceCell::new(),
        }
    }

    fn sha(&self) -> String {
        self.sha
            .get_or_init(|| match self.commits.head_sha() {
                Ok(sha) => short_sha(&sha),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not resolve commit sha; links will carry its output instead");
                    short_sha(&e.raw_output())
                }
            })
            .clone()
    }

    /// Resolve both link settings against the project's repository.
    pub fn prepare(
        &self,
        project: &ProjectMeta,
        source: &LinkSetting,
        edit: &LinkSetting,
    ) -> Result<SiteLinks, LinkError> {
        let mut repo = String::new();
        let mut source = source.clone();
        let mut edit = edit.clone();

        let wants_default = source == LinkSetting::Enabled(true) || edit == LinkSetting::Enabled(true);
        if let Some(url) = project.repository_url()
            && wants_default
            && let Some((host, slug)) = match_host(url)
        {
            tracing::debug!(host = host.name, repo = %slug, "Matched repository host");
            repo = slug;
            if source == LinkSetting::Enabled(true) {
                source = LinkSetting::Template(host.source_link.to_string());
            }
            if edit == LinkSetting::Enabled(true) {
                edit = LinkSetting::Template(host.edit_link.to_string());
            }
        }

        let base = LinkValues {
            repo,
            version: project.version.clone().unwrap_or_else(|| "master".to_string()),
            sha: String::new(),
        };
        Ok(SiteLinks {
            source: self.make_link_fn(&source, &base)?,
            edit: self.make_link_fn(&edit, &base)?,
        })
    }

    fn make_link_fn(
        &self,
        setting: &LinkSetting,
        base: &LinkValues,
    ) -> Result<LinkFunction, LinkError> {
        let LinkSetting::Template(template) = setting else {
            return Ok(LinkFunction::Disabled);
        };
        validate_template(template)?;
        let mut values = base.clone();
        if references_sha(template) {
            values.sha = self.sha();
        }
        Ok(LinkFunction::Template {
            template: template.clone(),
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FixedSha {
        result: Result<&'static str, &'static str>,
        calls: Cell<u32>,
    }

    impl FixedSha {
        fn ok(sha: &'static str) -> Self {
            Self {
                result: Ok(sha),
                calls: Cell::new(0),
            }
        }

        fn failing(msg: &'static str) -> Self {
            Self {
                result: Err(msg),
                calls: Cell::new(0),
            }
        }
    }

    impl CommitResolver for FixedSha {
        fn head_sha(&self) -> Result<String, LinkError> {
            self.calls.set(self.calls.get() + 1);
            self.result
                .map(str::to_string)
                .map_err(|m| LinkError::Git(m.to_string()))
        }
    }

    fn project(url: &str) -> ProjectMeta {
        serde_json::from_value(serde_json::json!({
            "version": "1.2.0",
            "repository": { "url": url }
        }))
        .unwrap()
    }

    // =========================================================================
    // Host matching
    // =========================================================================

    #[test]
    fn slug_same_for_https_ssh_and_git_suffix() {
        let urls = [
            "https://github.com/m7r/grunt-ngdocs",
            "https://github.com/m7r/grunt-ngdocs.git",
            "http://github.com/m7r/grunt-ngdocs.git",
            "git@github.com:m7r/grunt-ngdocs.git",
            "git@github.com:m7r/grunt-ngdocs",
        ];
        for url in urls {
            let (host, slug) = match_host(url).unwrap();
            assert_eq!(host.name, "github");
            assert_eq!(slug, "m7r/grunt-ngdocs", "url: {url}");
        }
    }

    #[test]
    fn unknown_host_does_not_match() {
        assert!(match_host("https://gitlab.com/a/b.git").is_none());
    }

    // =========================================================================
    // Link functions
    // =========================================================================

    #[test]
    fn default_github_links() {
        let commits = FixedSha::ok("0123456789abcdef");
        let links = LinkResolver::new(&commits)
            .prepare(
                &project("git@github.com:m7r/grunt-ngdocs.git"),
                &LinkSetting::Enabled(true),
                &LinkSetting::Enabled(true),
            )
            .unwrap();
        assert_eq!(
            links.source.url("src/ngdoc.js", Some(3), Some(10)).unwrap(),
            "https://github.com/m7r/grunt-ngdocs/blob/0123456/src/ngdoc.js#L10"
        );
        assert_eq!(
            links.edit.url("src/ngdoc.js", Some(3), Some(10)).unwrap(),
            "https://github.com/m7r/grunt-ngdocs/edit/master/src/ngdoc.js"
        );
    }

    #[test]
    fn sha_resolved_once_per_run() {
        let commits = FixedSha::ok("abcdef0123");
        let resolver = LinkResolver::new(&commits);
        let tmpl = LinkSetting::Template("x/{{sha}}/{{file}}".into());
        resolver
            .prepare(&ProjectMeta::default(), &tmpl, &tmpl)
            .unwrap();
        assert_eq!(commits.calls.get(), 1);
    }

    #[test]
    fn sha_not_resolved_when_unused() {
        let commits = FixedSha::ok("abcdef0123");
        LinkResolver::new(&commits)
            .prepare(
                &ProjectMeta::default(),
                &LinkSetting::Template("x/{{file}}".into()),
                &LinkSetting::Enabled(false),
            )
            .unwrap();
        assert_eq!(commits.calls.get(), 0);
    }

    #[test]
    fn sha_failure_is_embedded_not_fatal() {
        let commits = FixedSha::failing("fatal: not a git repository");
        let links = LinkResolver::new(&commits)
            .prepare(
                &ProjectMeta::default(),
                &LinkSetting::Template("{{sha}}".into()),
                &LinkSetting::Enabled(false),
            )
            .unwrap();
        // git's own output, truncated to seven characters
        assert_eq!(links.source.url("f", None, None).unwrap(), "fatal: ");
    }

    #[test]
    fn raw_output_drops_error_prefix() {
        let git = LinkError::Git("fatal: bad revision\n".into());
        assert_eq!(git.raw_output(), "fatal: bad revision\n");
        let io = LinkError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "no git"));
        assert_eq!(io.raw_output(), "no git");
    }

    #[test]
    fn filepath_of_bare_file_is_dot() {
        let commits = FixedSha::ok("deadbeef");
        let links = LinkResolver::new(&commits)
            .prepare(
                &ProjectMeta::default(),
                &LinkSetting::Template("{{filepath}}|{{filename}}".into()),
                &LinkSetting::Enabled(false),
            )
            .unwrap();
        assert_eq!(links.source.url("a.js", None, None).unwrap(), ".|a.js");
        assert_eq!(links.source.url("src/a.js", None, None).unwrap(), "src|a.js");
    }

    #[test]
    fn explicit_template_values() {
        let commits = FixedSha::ok("deadbeef");
        let links = LinkResolver::new(&commits)
            .prepare(
                &project("https://github.com/a/b"),
                &LinkSetting::Template(
                    "{{ version }}|{{filepath}}|{{filename}}|{{line}}|{{repo}}".into(),
                ),
                &LinkSetting::Enabled(false),
            )
            .unwrap();
        // explicit template: host not consulted for the slug
        assert_eq!(
            links.source.url("src/a/b.js", Some(7), None).unwrap(),
            "1.2.0|src/a|b.js|7|"
        );
        assert_eq!(links.edit, LinkFunction::Disabled);
    }

    #[test]
    fn true_without_known_host_is_disabled() {
        let commits = FixedSha::ok("deadbeef");
        let links = LinkResolver::new(&commits)
            .prepare(
                &project("https://example.com/a/b.git"),
                &LinkSetting::Enabled(true),
                &LinkSetting::Enabled(true),
            )
            .unwrap();
        assert_eq!(links, SiteLinks::disabled());
        assert!(links.source.url("f", None, None).is_none());
    }

    #[test]
    fn version_defaults_to_master() {
        let commits = FixedSha::ok("deadbeef");
        let links = LinkResolver::new(&commits)
            .prepare(
                &ProjectMeta::default(),
                &LinkSetting::Template("{{version}}".into()),
                &LinkSetting::Enabled(false),
            )
            .unwrap();
        assert_eq!(links.source.url("f", None, None).unwrap(), "master");
    }

    #[test]
    fn unknown_placeholder_rejected() {
        let commits = FixedSha::ok("deadbeef");
        let err = LinkResolver::new(&commits)
            .prepare(
                &ProjectMeta::default(),
                &LinkSetting::Template("{{branch}}/{{file}}".into()),
                &LinkSetting::Enabled(false),
            )
            .unwrap_err();
        assert!(matches!(err, LinkError::UnknownPlaceholder(name, _) if name == "branch"));
    }

    #[test]
    fn empty_template_rejected() {
        let commits = FixedSha::ok("deadbeef");
        let err = LinkResolver::new(&commits)
            .prepare(
                &ProjectMeta::default(),
                &LinkSetting::Template("  ".into()),
                &LinkSetting::Enabled(false),
            )
            .unwrap_err();
        assert!(matches!(err, LinkError::EmptyTemplate));
    }

    #[test]
    fn index_template_delimiters_untouched() {
        let commits = FixedSha::ok("deadbeef");
        let links = LinkResolver::new(&commits)
            .prepare(
                &ProjectMeta::default(),
                &LinkSetting::Template("<%= title %>/{{file}}".into()),
                &LinkSetting::Enabled(false),
            )
            .unwrap();
        assert_eq!(links.source.url("a.js", None, None).unwrap(), "<%= title %>/a.js");
    }

    #[test]
    fn link_setting_parses_bool_or_string() {
        #[derive(Deserialize)]
        struct T {
            a: LinkSetting,
            b: LinkSetting,
        }
        let t: T = toml::from_str("a = false\nb = \"x/{{file}}\"").unwrap();
        assert_eq!(t.a, LinkSetting::Enabled(false));
        assert_eq!(t.b, LinkSetting::Template("x/{{file}}".into()));
    }
}
