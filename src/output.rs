//! CLI output formatting for build runs.
//!
//! Output leads with what was built (section, title, page ids) and shows
//! files as indented context, so it reads as an inventory of the site.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! api → docs (API Documentation, new site)
//!     001 ng.filter → partials/api/ng.filter.html
//!     002 ng.directive:ngClick → partials/api/ng.directive.ngClick.html
//! TODO index: 3 items in 2 files
//! Inlined 3 partials into docs/index.html
//! Built 2 pages in 14ms
//! ```
//!
//! ## Check
//!
//! ```text
//! api (API Documentation, api)
//!     Source: build/api.json
//!     Source: build/extra.json (missing)
//!     12 records
//! ```
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout.

use crate::inline::InlineReport;
use crate::manifest::LoadOrigin;
use crate::pipeline::{RunReport, SectionCheck, TodoOutcome};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Page id of a partial path: its file stem.
fn page_name(partial: &str) -> &str {
    let file = partial.rsplit('/').next().unwrap_or(partial);
    file.strip_suffix(".html").unwrap_or(file)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

pub fn format_run_output(report: &RunReport) -> Vec<String> {
    let mut lines = Vec::new();
    let origin = match report.origin {
        LoadOrigin::Fresh => "new site",
        LoadOrigin::Existing => "updated",
    };
    lines.push(format!(
        "{} \u{2192} {} ({}, {})",
        report.section,
        report.dest.display(),
        report.title,
        origin
    ));

    for (i, partial) in report.partials.iter().enumerate() {
        lines.push(format!(
            "    {} {} \u{2192} {}",
            format_index(i + 1),
            page_name(partial),
            partial
        ));
    }

    match report.todos {
        TodoOutcome::NotRequested => {}
        TodoOutcome::Empty => lines.push("TODO index: no items".to_string()),
        TodoOutcome::Found { todos, files } => lines.push(format!(
            "TODO index: {} in {}",
            plural(todos, "item", "items"),
            plural(files, "file", "files")
        )),
    }

    if let Some(n) = report.inlined {
        lines.push(format!(
            "Inlined {} into {}",
            plural(n, "partial", "partials"),
            report.dest.join("index.html").display()
        ));
    }

    lines.push(format!(
        "Built {} in {}ms",
        plural(report.partials.len(), "page", "pages"),
        report.elapsed.as_millis()
    ));
    lines
}

pub fn print_run_output(report: &RunReport) {
    for line in format_run_output(report) {
        println!("{}", line);
    }
}

pub fn format_inline_output(report: &InlineReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Inlined {} into {}",
        plural(report.partials.len(), "partial", "partials"),
        report.index_file.display()
    )];
    lines.extend(report.partials.iter().map(|key| format!("    {key}")));
    lines
}

pub fn print_inline_output(report: &InlineReport) {
    for line in format_inline_output(report) {
        println!("{}", line);
    }
}

/// Format the result of validating the configured sections.
pub fn format_check_output(checks: &[SectionCheck]) -> Vec<String> {
    let mut lines = Vec::new();
    if checks.is_empty() {
        lines.push("No sections configured".to_string());
        return lines;
    }
    for check in checks {
        let kind = if check.is_api { "api" } else { "guide" };
        lines.push(format!("{} ({}, {})", check.key, check.title, kind));
        for (path, exists) in &check.files {
            let missing = if *exists { "" } else { " (missing)" };
            lines.push(format!("    Source: {}{}", path.display(), missing));
        }
        lines.push(format!("    {}", plural(check.records, "record", "records")));
    }
    lines
}

pub fn print_check_output(checks: &[SectionCheck]) {
    for line in format_check_output(checks) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn report() -> RunReport {
        RunReport {
            section: "api".into(),
            title: "API Documentation".into(),
            dest: PathBuf::from("docs"),
            origin: LoadOrigin::Fresh,
            partials: vec![
                "partials/api/ng.filter.html".into(),
                "partials/api/ng.directive.ngClick.html".into(),
            ],
            todos: TodoOutcome::NotRequested,
            todo_page_registered: false,
            inlined: None,
            elapsed: Duration::from_millis(14),
        }
    }

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn page_name_strips_dir_and_extension() {
        assert_eq!(page_name("partials/api/ng.filter.html"), "ng.filter");
        assert_eq!(page_name("index"), "index");
    }

    #[test]
    fn run_output_lists_pages() {
        let lines = format_run_output(&report());
        assert_eq!(lines[0], "api \u{2192} docs (API Documentation, new site)");
        assert_eq!(lines[1], "    001 ng.filter \u{2192} partials/api/ng.filter.html");
        assert_eq!(
            lines[2],
            "    002 ng.directive.ngClick \u{2192} partials/api/ng.directive.ngClick.html"
        );
        assert_eq!(lines.last().unwrap(), "Built 2 pages in 14ms");
    }

    #[test]
    fn run_output_todos_and_inline() {
        let mut r = report();
        r.origin = LoadOrigin::Existing;
        r.todos = TodoOutcome::Found { todos: 1, files: 1 };
        r.inlined = Some(3);
        let lines = format_run_output(&r);
        assert!(lines[0].ends_with("updated)"));
        assert!(lines.contains(&"TODO index: 1 item in 1 file".to_string()));
        assert!(lines.iter().any(|l| l.starts_with("Inlined 3 partials into ")));
    }

    #[test]
    fn run_output_empty_todos() {
        let mut r = report();
        r.todos = TodoOutcome::Empty;
        assert!(format_run_output(&r).contains(&"TODO index: no items".to_string()));
    }

    #[test]
    fn inline_output() {
        let lines = format_inline_output(&InlineReport {
            index_file: PathBuf::from("docs/index.html"),
            partials: vec!["partials/api/a.html".into()],
        });
        assert_eq!(
            lines,
            vec!["Inlined 1 partial into docs/index.html", "    partials/api/a.html"]
        );
    }

    #[test]
    fn check_output_marks_missing_files() {
        let checks = vec![SectionCheck {
            key: "guide".into(),
            title: "Guide".into(),
            is_api: false,
            files: vec![
                (PathBuf::from("build/guide.json"), true),
                (PathBuf::from("build/extra.json"), false),
            ],
            records: 0,
        }];
        assert_eq!(
            format_check_output(&checks),
            vec![
                "guide (Guide, guide)",
                "    Source: build/guide.json",
                "    Source: build/extra.json (missing)",
                "    0 records",
            ]
        );
    }

    #[test]
    fn check_output_without_sections() {
        assert_eq!(format_check_output(&[]), vec!["No sections configured"]);
    }
}
