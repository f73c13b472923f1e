//! `@todo` aggregation and the TODO index page.
//!
//! Records carry their own todo markers, and so do their methods. The index
//! groups them by source file, then by section within the file:
//!
//! ```text
//! src/ng/compile.js
//!     file          ← todos on the record itself
//!     $compile      ← todos on the `$compile` method
//!     directive
//! ```
//!
//! The `file` section always comes first; method sections follow in
//! lexicographic order. Files are listed lexicographically.

use crate::types::{DocRecord, TodoMarker};
use maud::{Markup, PreEscaped, html};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Section holding the todos attached to the record itself.
pub const FILE_SECTION: &str = "file";

/// All todos found in one source file, keyed by section name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoFile {
    pub file_name: String,
    pub sections: BTreeMap<String, Vec<TodoMarker>>,
}

impl TodoFile {
    fn section_mut(&mut self, name: &str) -> &mut Vec<TodoMarker> {
        self.sections.entry(name.to_string()).or_default()
    }

    /// Sections in display order: `file` first, then lexicographic.
    pub fn ordered_sections(&self) -> Vec<(&str, &[TodoMarker])> {
        let mut sections: Vec<_> = self
            .sections
            .iter()
            .map(|(name, todos)| (name.as_str(), todos.as_slice()))
            .collect();
        sections.sort_by(|a, b| section_order(a.0, b.0));
        sections
    }
}

/// `file` sorts before every other section; the rest compare as strings.
pub fn section_order(a: &str, b: &str) -> Ordering {
    match (a == FILE_SECTION, b == FILE_SECTION) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

/// Todos of a whole run, grouped by file and section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoIndex {
    pub files: BTreeMap<String, TodoFile>,
    pub todo_count: usize,
}

impl TodoIndex {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    fn push(&mut self, file: &str, section: &str, todo: &TodoMarker) {
        self.files
            .entry(file.to_string())
            .or_insert_with(|| TodoFile {
                file_name: file.to_string(),
                sections: BTreeMap::new(),
            })
            .section_mut(section)
            .push(todo.clone());
        self.todo_count += 1;
    }
}

/// Collect every todo of the run.
///
/// Returns `None` when no record or method carries a todo, so callers render
/// the empty-state page instead of a zero-count index.
pub fn aggregate(records: &[DocRecord]) -> Option<TodoIndex> {
    let mut index = TodoIndex::default();
    for record in records {
        for todo in &record.todos {
            index.push(&record.file, FILE_SECTION, todo);
        }
        for method in &record.methods {
            for todo in &method.todos {
                index.push(&record.file, &method.name, todo);
            }
        }
    }
    (index.todo_count > 0).then_some(index)
}

/// Render `partials/todo/index.html`.
pub fn render_todo_page(index: Option<&TodoIndex>) -> Markup {
    match index {
        Some(index) => html! {
            h1 { "To Do" }
            p {
                (index.todo_count) " " code { "@todo" }
                " items found in " (index.file_count()) " files."
            }
            @for file in index.files.values() {
                h2 { (file.file_name) }
                @for (name, todos) in file.ordered_sections() {
                    @if name != FILE_SECTION {
                        h3 { (name) }
                    }
                    ul {
                        @for todo in todos {
                            // preformatted by the Reader
                            li { (PreEscaped(&todo.full)) }
                        }
                    }
                }
            }
        },
        None => html! {
            h1 { "To Do" }
            p { "You have no " code { "@todo" } " items!" }
        },
    }
}
