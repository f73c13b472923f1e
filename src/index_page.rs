//! `index.html`, the single-page shell of the site.
//!
//! Rendered from a template, either the built-in `static/index.tmpl` or the
//! file named by `template` in the config. Placeholders are `<%= name %>` and
//! come from a fixed substitution set:
//!
//! | Name | Value |
//! |------|-------|
//! | `scripts` | one `<script>` tag per script (`defer` when `deferLoad`) |
//! | `styles` | one stylesheet `<link>` per style |
//! | `sections` | section keys joined with `|` |
//! | `title`, `titleLink` | site title and its link target |
//! | `image` | logo, wrapped in a link when `imageLink` is set |
//! | `imageLink`, `bestMatch`, `deferLoad` | raw option values |
//! | `analytics`, `discussions` | embed snippets, empty when unset |
//! | `navContent` | contents of the nav template, inserted verbatim |
//!
//! Every value except `navContent` is produced by maud, so option values are
//! escaped. A placeholder outside the set is a template error.

use crate::config::{AnalyticsConfig, DiscussionsConfig};
use maud::{Markup, html};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("cannot read index template {path}: {source}")]
    Missing {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unknown placeholder <%= {0} %> in index template")]
    UnknownPlaceholder(String),
}

const BUILTIN_TEMPLATE: &str = include_str!("../static/index.tmpl");

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<%=\s*(\w+)\s*%>").unwrap());

/// Everything the index template can reference.
#[derive(Debug, Clone, Default)]
pub struct IndexData<'a> {
    pub scripts: &'a [String],
    pub styles: &'a [String],
    pub sections: Vec<&'a str>,
    pub title: &'a str,
    pub title_link: Option<&'a str>,
    pub image: Option<&'a str>,
    pub image_link: Option<&'a str>,
    pub best_match: bool,
    pub analytics: Option<&'a AnalyticsConfig>,
    pub discussions: Option<&'a DiscussionsConfig>,
    pub nav_content: &'a str,
    pub defer_load: bool,
}

impl IndexData<'_> {
    fn substitutions(&self) -> BTreeMap<&'static str, String> {
        let defer = self.defer_load;
        let scripts: Markup = html! {
            @for src in self.scripts {
                script src=(src) defer[defer] {}
            }
        };
        let styles: Markup = html! {
            @for href in self.styles {
                link rel="stylesheet" href=(href);
            }
        };
        let image: Markup = html! {
            @if let Some(src) = self.image {
                @if let Some(href) = self.image_link {
                    a.logo href=(href) { img src=(src) alt=(self.title); }
                } @else {
                    img.logo src=(src) alt=(self.title);
                }
            }
        };
        let analytics: Markup = html! {
            @if let Some(ga) = self.analytics {
                script
                    data-analytics-account=(ga.account)
                    data-analytics-domain=[ga.domain_name.as_deref()]
                    src="https://www.google-analytics.com/analytics.js" {}
            }
        };
        let discussions: Markup = html! {
            @if let Some(d) = self.discussions {
                div id="disqus_thread"
                    data-shortname=(d.short_name)
                    data-url=(d.url)
                    data-dev=(d.dev.to_string()) {}
            }
        };
        let text = |s: &str| -> String {
            let escaped: Markup = html! { (s) };
            escaped.into_string()
        };

        BTreeMap::from([
            ("scripts", scripts.into_string()),
            ("styles", styles.into_string()),
            ("sections", text(&self.sections.join("|"))),
            ("title", text(self.title)),
            ("titleLink", text(self.title_link.unwrap_or(""))),
            ("image", image.into_string()),
            ("imageLink", text(self.image_link.unwrap_or(""))),
            ("bestMatch", self.best_match.to_string()),
            ("analytics", analytics.into_string()),
            ("discussions", discussions.into_string()),
            ("navContent", self.nav_content.to_string()),
            ("deferLoad", self.defer_load.to_string()),
        ])
    }
}

/// Read the index template: the configured file, or the built-in one.
pub fn load_template(path: Option<&Path>) -> Result<String, TemplateError> {
    match path {
        Some(path) => fs::read_to_string(path).map_err(|source| TemplateError::Missing {
            path: path.to_path_buf(),
            source,
        }),
        None => Ok(BUILTIN_TEMPLATE.to_string()),
    }
}

/// Substitute every placeholder of `template`.
pub fn render_index(template: &str, data: &IndexData) -> Result<String, TemplateError> {
    let values = data.substitutions();
    if let Some(unknown) = PLACEHOLDER
        .captures_iter(template)
        .find(|caps| !values.contains_key(&caps[1]))
    {
        return Err(TemplateError::UnknownPlaceholder(unknown[1].to_string()));
    }
    Ok(PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures| values[&caps[1]].clone())
        .into_owned())
}
