//! Per-record partial rendering.
//!
//! The Reader hands over each record's body already rendered. What gets added
//! here are the links back to the repository, which depend on the run's link
//! configuration rather than on the record.

use crate::links::SiteLinks;
use crate::types::DocRecord;
use maud::{Markup, PreEscaped, html};

/// Render the partial for one record: repository links, then the body.
pub fn render_partial(record: &DocRecord, links: &SiteLinks) -> Markup {
    let edit = links.edit.url(&record.file, record.line, record.codeline);
    let source = links.source.url(&record.file, record.line, record.codeline);

    html! {
        @if let Some(href) = edit {
            a.improve-doc href=(href) target="_blank" rel="noopener" {
                i.icon-edit { " " }
                " Improve this doc"
            }
        }
        @if let Some(href) = source {
            a.view-source href=(href) target="_blank" rel="noopener" {
                i.icon-eye-open { " " }
                " View source"
            }
        }
        (PreEscaped(&record.html))
    }
}
