//! Partial file naming.
//!
//! Every record becomes `partials/<section>/<id>.html`. Record ids are not
//! always safe file stems, so they go through [`sanitize_id`] first:
//!
//! - `angular.Module` → `angular.IModule`: on case-insensitive file systems
//!   (macOS) `angular.module` and `angular.Module` would map to the same file.
//! - `ng.directive:ngClick` → `ng.directive.ngClick`: `:` is not portable in
//!   file names. Only the first colon is rewritten; ids never carry more.

use std::path::{Path, PathBuf};

/// Turn a record id into the partial file stem.
pub fn sanitize_id(id: &str) -> String {
    id.replacen("angular.Module", "angular.IModule", 1)
        .replacen(':', ".", 1)
}

/// Path of the rendered partial for `id` within `section`, relative to `dest`.
pub fn partial_path(dest: &Path, section: &str, id: &str) -> PathBuf {
    dest.join("partials")
        .join(section)
        .join(format!("{}.html", sanitize_id(id)))
}
