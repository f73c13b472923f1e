//! Shared types passed between pipeline stages.
//!
//! [`DocRecord`] is what the Reader hands us, [`PageMetadata`] is what ends up
//! in the persisted manifest. Both use camelCase on the wire because the site
//! shell reads the manifest directly.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A single `@todo` marker attached to a record or one of its methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoMarker {
    /// Free text of the marker.
    pub text: String,
    /// Preformatted HTML, emitted verbatim on the TODO index page.
    pub full: String,
}

/// A documented method of a record. Only its todos matter to the site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodRecord {
    pub name: String,
    #[serde(default)]
    pub todos: Vec<TodoMarker>,
}

/// One parsed documentation unit, produced by the Reader from a comment block.
///
/// `section` is not part of the Reader output: the pipeline assigns the run's
/// target section to every record it loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocRecord {
    pub id: String,
    #[serde(default)]
    pub section: String,
    /// Source file the comment block came from.
    pub file: String,
    /// Line of the comment block.
    #[serde(default)]
    pub line: Option<u32>,
    /// Line of the code the comment documents.
    #[serde(default)]
    pub codeline: Option<u32>,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default, rename = "type")]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub module_name: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub todos: Vec<TodoMarker>,
    #[serde(default)]
    pub methods: Vec<MethodRecord>,
    /// Rendered page body.
    #[serde(default)]
    pub html: String,
}

impl DocRecord {
    /// Flatten into the manifest projection.
    pub fn metadata(&self) -> PageMetadata {
        PageMetadata {
            section: self.section.clone(),
            id: self.id.clone(),
            short_name: self.short_name.clone().unwrap_or_else(|| self.id.clone()),
            doc_type: self.doc_type.clone().unwrap_or_else(|| "overview".to_string()),
            module_name: self.module_name.clone().unwrap_or_default(),
            source_file: self.file.clone(),
            short_description: self.short_description.clone().unwrap_or_default(),
            keywords: self.keywords.clone().unwrap_or_default(),
        }
    }
}

/// Serializable per-page entry of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub section: String,
    pub id: String,
    pub short_name: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default)]
    pub module_name: String,
    #[serde(default)]
    pub source_file: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub keywords: String,
}

impl PageMetadata {
    /// The synthesized entry for `partials/todo/index.html`.
    pub fn todo_index() -> Self {
        Self {
            section: "todo".to_string(),
            id: "index".to_string(),
            short_name: "TODO".to_string(),
            doc_type: "overview".to_string(),
            module_name: "TODO".to_string(),
            source_file: "docs/content/todo/".to_string(),
            short_description: "To Dos".to_string(),
            keywords: "overview todo todos".to_string(),
        }
    }
}

/// `repository` in a project descriptor is either a bare URL or `{ "url": ... }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Repository {
    Url(String),
    Object {
        #[serde(default)]
        url: Option<String>,
    },
}

/// The parts of a `package.json`-style project descriptor we care about.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProjectMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub repository: Option<Repository>,
}

impl ProjectMeta {
    /// Read a descriptor, treating a missing or unreadable file as empty.
    pub fn load(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&content) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable project descriptor");
                Self::default()
            }
        }
    }

    pub fn repository_url(&self) -> Option<&str> {
        match self.repository.as_ref()? {
            Repository::Url(url) => Some(url.as_str()),
            Repository::Object { url } => url.as_deref(),
        }
    }

    /// Site title fallback: `title`, then `name`.
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_default()
    }
}
