//! Site configuration module.
//!
//! Handles loading, validating, and merging `docsite.toml`. The user file is
//! sparse: it is layered on top of the stock defaults, so it only needs the
//! keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! dest = "docs"                 # Output directory
//! project = "package.json"      # Project descriptor (repository url, version, title)
//! start_page = "/api"           # Page the site opens on
//! scripts = ["angular.js"]      # Scripts loaded by index.html
//! styles = []                   # Stylesheets loaded by index.html
//! html5_mode = false            # Use HTML5 history instead of hash URLs
//! edit_example = true           # Offer "Edit in Plunker" on examples
//! source_link = true            # true = host default, false = off, or a template
//! edit_link = true
//! inline_partials = false       # Collapse all partials into index.html
//! shell = "docs-shell"          # Extra files seeded into a fresh dest
//! generate_partials_todo_index = false
//! do_not_generate_standard_index_html = false
//! best_match = false
//! defer_load = false
//!
//! [sections.api]
//! title = "API Documentation"
//! src = ["build/api.json"]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::links::LinkSetting;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Unknown section '{0}' (configured: {1})")]
    UnknownSection(String, String),
}

/// Default name of the configuration file.
pub const CONFIG_FILENAME: &str = "docsite.toml";

/// Section key that the `all` target is built under.
pub const API_SECTION: &str = "api";

/// Title used for a section that does not configure one.
pub const DEFAULT_SECTION_TITLE: &str = "API Documentation";

/// Site configuration loaded from `docsite.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Output directory of the generated site.
    pub dest: PathBuf,
    /// Project descriptor providing repository url, version and title.
    pub project: PathBuf,
    /// Route the site opens on.
    pub start_page: String,
    /// Scripts loaded by `index.html`. `angular.js` maps to the bundled copy.
    pub scripts: Vec<String>,
    /// Stylesheets loaded by `index.html`.
    pub styles: Vec<String>,
    /// Site title. Falls back to the project's title or name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub html5_mode: bool,
    pub edit_example: bool,
    pub source_link: LinkSetting,
    pub edit_link: LinkSetting,
    /// Embed every partial into `index.html` after the build.
    pub inline_partials: bool,
    /// HTML snippet inserted into the navigation bar.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nav_template: Option<PathBuf>,
    pub generate_partials_todo_index: bool,
    pub do_not_generate_standard_index_html: bool,
    /// Logo shown next to the title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_link: Option<String>,
    pub best_match: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics: Option<AnalyticsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discussions: Option<DiscussionsConfig>,
    /// Directory copied into `dest` on the first build (`*.tmpl` excluded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<PathBuf>,
    /// Custom index template replacing the built-in one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
    /// Load scripts with `defer`.
    pub defer_load: bool,
    /// Inputs of each section, keyed by section name, in file order.
    pub sections: IndexMap<String, SectionConfig>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            dest: PathBuf::from("docs"),
            project: PathBuf::from("package.json"),
            start_page: "/api".to_string(),
            scripts: vec!["angular.js".to_string()],
            styles: Vec::new(),
            title: None,
            html5_mode: false,
            edit_example: true,
            source_link: LinkSetting::Enabled(true),
            edit_link: LinkSetting::Enabled(true),
            inline_partials: false,
            nav_template: None,
            generate_partials_todo_index: false,
            do_not_generate_standard_index_html: false,
            image: None,
            title_link: None,
            image_link: None,
            best_match: false,
            analytics: None,
            discussions: None,
            shell: None,
            template: None,
            defer_load: false,
            sections: IndexMap::new(),
        }
    }
}

/// One section's inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SectionConfig {
    /// Navigation title of the section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Whether the section holds API docs. Always true for `api`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<bool>,
    /// Record files produced by the Reader. Missing files are skipped.
    pub src: Vec<PathBuf>,
}

/// Google Analytics settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsConfig {
    pub account: String,
    #[serde(default, alias = "domainName")]
    pub domain_name: Option<String>,
}

/// Disqus settings. Also written into the manifest, so camelCase on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DiscussionsConfig {
    #[serde(alias = "short_name")]
    pub short_name: String,
    pub url: String,
    #[serde(default)]
    pub dev: bool,
}

/// Map a build target onto its section key: `all` builds the API section.
pub fn section_key(target: &str) -> &str {
    if target == "all" { API_SECTION } else { target }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dest.as_os_str().is_empty() {
            return Err(ConfigError::Validation("dest must not be empty".into()));
        }
        if !self.start_page.starts_with('/') {
            return Err(ConfigError::Validation(
                "start_page must start with '/'".into(),
            ));
        }
        if self.scripts.iter().chain(&self.styles).any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "scripts and styles must not contain empty entries".into(),
            ));
        }
        for key in self.sections.keys() {
            let valid = !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if !valid {
                return Err(ConfigError::Validation(format!(
                    "section name '{key}' must be non-empty and use only letters, digits, '-' or '_'"
                )));
            }
        }
        for (setting, name) in [(&self.source_link, "source_link"), (&self.edit_link, "edit_link")] {
            if matches!(setting, LinkSetting::Template(t) if t.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be true, false, or a non-empty template"
                )));
            }
        }
        Ok(())
    }

    /// Look up a section by build target.
    pub fn section(&self, target: &str) -> Result<&SectionConfig, ConfigError> {
        let key = section_key(target);
        self.sections.get(key).ok_or_else(|| {
            let known: Vec<&str> = self.sections.keys().map(String::as_str).collect();
            ConfigError::UnknownSection(key.to_string(), known.join(", "))
        })
    }
}

impl SectionConfig {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_SECTION_TITLE)
    }

    pub fn is_api(&self, key: &str) -> bool {
        self.api.unwrap_or(false) || key == API_SECTION
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, layered over the stock defaults.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `docsite.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# docsite Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Output directory. Several sections can be built into the same directory,
# one run each; the manifest keeps every section's pages.
dest = "docs"

# Project descriptor (package.json layout). Supplies the repository url used
# for source links, the version, and the fallback site title.
project = "package.json"

# Route the site opens on.
start_page = "/api"

# Scripts and stylesheets loaded by index.html. Remote urls and paths starting
# with ../ are referenced as-is; local files are copied into the output.
scripts = ["angular.js"]
styles = []

# Site title. Defaults to the project's title or name.
# title = "My Project"

html5_mode = false
edit_example = true

# ---------------------------------------------------------------------------
# Repository links
# ---------------------------------------------------------------------------
# true  -> default template of the detected host (GitHub)
# false -> no link
# "..." -> explicit template. Placeholders: {{repo}} {{version}} {{sha}}
#          {{file}} {{filepath}} {{filename}} {{line}} {{codeline}}
source_link = true
edit_link = true

# ---------------------------------------------------------------------------
# Output shape
# ---------------------------------------------------------------------------
# Collapse all partials into index.html (single self-contained page).
inline_partials = false

# Write partials/todo/index.html listing every @todo.
generate_partials_todo_index = false

# Register the TODO page in the manifest without writing it.
do_not_generate_standard_index_html = false

# HTML snippet inserted into the navigation bar.
# nav_template = "docs-nav.html"

# Directory copied into dest on the first build, e.g. one holding
# js/angular.min.js and extra theme files. *.tmpl files are skipped.
# shell = "docs-shell"

# Custom index template (placeholders use <%= name %>).
# template = "index.tmpl"

# image = "logo.png"
# title_link = "/"
# image_link = "/"
best_match = false
defer_load = false

# [analytics]
# account = "UA-000000-0"
# domain_name = "example.com"

# [discussions]
# short_name = "my-disqus"
# url = "https://example.com"
# dev = false

# ---------------------------------------------------------------------------
# Sections: one build run per section
# ---------------------------------------------------------------------------
# [sections.api]
# title = "API Documentation"
# src = ["build/records/api.json"]
#
# [sections.guide]
# title = "Developer Guide"
# api = false
# src = ["build/records/guide.json"]
"##
}
