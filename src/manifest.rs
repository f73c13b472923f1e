//! The persisted site manifest.
//!
//! Every build run documents one section. The manifest is what ties the runs
//! together: it lists the sections built so far and every page of every
//! section, and the site shell reads it to build its navigation.
//!
//! ## File format
//!
//! The manifest lives at `<dest>/js/docs-setup.js` and is loaded by the shell
//! as a plain script, so it is stored as an assignment to a global:
//!
//! ```text
//! NG_DOCS={
//!   "sections": { "api": "API Documentation" },
//!   "pages": [ ... ],
//!   "apis": { "api": true },
//!   ...
//! };
//! ```
//!
//! Reading it back never executes it: the `NG_DOCS=` prefix and the trailing
//! `;` are stripped and the rest is parsed as JSON. Keys starting with `__`
//! are scratch data and are dropped, at any depth, before writing.
//!
//! ## Merging
//!
//! A run owns exactly one section. [`Manifest::merge`] replaces all pages of
//! that section and leaves every other page as it was, in the same order.
//! Sections keep the order in which they were first built; rebuilding one
//! does not move it.
//! Two runs with identical input write byte-identical manifests.
//!
//! Concurrent runs against the same destination are not supported: the file
//! is read, merged and written back without locking.

use crate::assets::{self, AssetError, SiteAssets};
use crate::config::{DiscussionsConfig, SiteConfig};
use crate::index_page::{self, IndexData, TemplateError};
use crate::types::PageMetadata;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Malformed manifest {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
    #[error("Index template error: {0}")]
    Template(#[from] TemplateError),
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
}

/// Location of the manifest within the destination.
pub const MANIFEST_FILENAME: &str = "js/docs-setup.js";

/// Global the manifest is assigned to.
pub const GLOBAL_NAME: &str = "NG_DOCS";

/// Keys with this prefix are never persisted.
pub const RESERVED_PREFIX: &str = "__";

/// Resolve the manifest path for a destination directory.
pub fn manifest_path(dest: &Path) -> PathBuf {
    dest.join(MANIFEST_FILENAME)
}

/// Cross-run site index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Section key → navigation title.
    #[serde(default)]
    pub sections: IndexMap<String, String>,
    /// Every page of every section, unique by `(section, id)`.
    #[serde(default)]
    pub pages: Vec<PageMetadata>,
    /// Section key → whether it holds API docs.
    #[serde(default)]
    pub apis: IndexMap<String, bool>,
    #[serde(default)]
    pub html5_mode: bool,
    #[serde(default)]
    pub edit_example: bool,
    #[serde(default)]
    pub start_page: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discussions: Option<DiscussionsConfig>,
    /// Base names of the scripts the index page loads.
    #[serde(default)]
    pub scripts: Vec<String>,
    /// Keys written by other tools, carried through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Whether [`Manifest::load`] found an existing manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    Existing,
    /// No manifest yet: the destination was seeded with the site shell.
    Fresh,
}

impl Manifest {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the manifest of `dest`.
    ///
    /// When there is none yet, returns an empty manifest and seeds `dest` with
    /// the site shell. A manifest that exists but cannot be parsed is an error.
    pub fn load(dest: &Path, shell: Option<&Path>) -> Result<(Self, LoadOrigin), ManifestError> {
        let path = manifest_path(dest);
        if !path.exists() {
            assets::seed_shell(dest, shell)?;
            return Ok((Self::empty(), LoadOrigin::Fresh));
        }
        let content = fs::read_to_string(&path)?;
        let manifest = Self::parse(&content).map_err(|reason| ManifestError::Malformed {
            path: path.clone(),
            reason,
        })?;
        tracing::debug!(
            path = %path.display(),
            pages = manifest.pages.len(),
            sections = manifest.sections.len(),
            "Loaded manifest"
        );
        Ok((manifest, LoadOrigin::Existing))
    }

    /// Parse the `NG_DOCS=...;` script form.
    pub fn parse(content: &str) -> Result<Self, String> {
        let body = content
            .trim()
            .strip_prefix(GLOBAL_NAME)
            .map(str::trim_start)
            .and_then(|rest| rest.strip_prefix('='))
            .ok_or_else(|| format!("expected `{GLOBAL_NAME}=` assignment"))?;
        let body = body.trim_end();
        let body = body.strip_suffix(';').unwrap_or(body);
        serde_json::from_str(body).map_err(|e| e.to_string())
    }

    /// Serialize to the `NG_DOCS=...;` script form, dropping reserved keys.
    pub fn to_script(&self) -> Result<String, ManifestError> {
        let mut value = serde_json::to_value(self)?;
        strip_reserved(&mut value);
        let json = serde_json::to_string_pretty(&value)?;
        Ok(format!("{GLOBAL_NAME}={json};"))
    }

    /// Write to `<dest>/js/docs-setup.js`.
    pub fn save(&self, dest: &Path) -> Result<PathBuf, ManifestError> {
        let path = manifest_path(dest);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, self.to_script()?)?;
        Ok(path)
    }

    /// Replace the pages of `section` with `new_pages`.
    ///
    /// Pages of other sections keep their content and order. Within the new
    /// pages, the first page with a given id wins.
    pub fn merge(&mut self, new_pages: Vec<PageMetadata>, section: &str) {
        self.pages.retain(|p| p.section != section);
        let mut seen = HashSet::new();
        for page in new_pages {
            if page.section != section {
                tracing::warn!(
                    id = %page.id,
                    page_section = %page.section,
                    section,
                    "Dropping page that does not belong to the section being built"
                );
                continue;
            }
            if seen.insert(page.id.clone()) {
                self.pages.push(page);
            } else {
                tracing::warn!(id = %page.id, section, "Duplicate page id; keeping the first");
            }
        }
    }

    /// Record the title and API flag of a section.
    pub fn set_section(&mut self, section: &str, title: &str, is_api: bool) {
        self.sections.insert(section.to_string(), title.to_string());
        self.apis.insert(section.to_string(), is_api);
    }

    /// Add the TODO index page unless a `todo` page already exists.
    pub fn ensure_todo_page(&mut self) -> bool {
        if self.pages.iter().any(|p| p.section == "todo") {
            return false;
        }
        self.pages.push(PageMetadata::todo_index());
        true
    }

    /// Copy the run settings the site shell reads from the manifest.
    pub fn apply_settings(&mut self, config: &SiteConfig, scripts: &[String]) {
        self.html5_mode = config.html5_mode;
        self.edit_example = config.edit_example;
        self.start_page = config.start_page.clone();
        self.discussions = config.discussions.clone();
        self.scripts = scripts
            .iter()
            .map(|s| s.rsplit('/').next().unwrap_or(s).to_string())
            .collect();
    }

    /// Section keys, in the order the index page lists them.
    pub fn section_keys(&self) -> Vec<&str> {
        self.sections.keys().map(String::as_str).collect()
    }
}

/// Remove every object key with the reserved prefix, recursively.
fn strip_reserved(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            map.retain(|key, _| !key.starts_with(RESERVED_PREFIX));
            map.values_mut().for_each(strip_reserved);
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(strip_reserved),
        _ => {}
    }
}

/// What [`write`] needs beyond the manifest itself.
pub struct WriteOptions<'a> {
    pub config: &'a SiteConfig,
    pub assets: &'a SiteAssets,
    pub title: &'a str,
    pub nav_content: &'a str,
}

/// Regenerate `index.html` and persist the manifest.
pub fn write(
    manifest: &mut Manifest,
    dest: &Path,
    options: &WriteOptions,
) -> Result<PathBuf, ManifestError> {
    let config = options.config;
    let template = index_page::load_template(config.template.as_deref())?;
    let data = IndexData {
        scripts: &options.assets.scripts,
        styles: &options.assets.styles,
        sections: manifest.section_keys(),
        title: options.title,
        title_link: config.title_link.as_deref(),
        image: options.assets.image.as_deref(),
        image_link: config.image_link.as_deref(),
        best_match: config.best_match,
        analytics: config.analytics.as_ref(),
        discussions: config.discussions.as_ref(),
        nav_content: options.nav_content,
        defer_load: config.defer_load,
    };
    let index = index_page::render_index(&template, &data)?;
    fs::create_dir_all(dest)?;
    fs::write(dest.join("index.html"), index)?;

    manifest.apply_settings(config, &options.assets.scripts);
    manifest.save(dest)
}
