//! One build run: a set of records in, one section of the site out.
//!
//! ```text
//! records ──▶ partials/<section>/*.html
//!    │
//!    ├──▶ manifest.merge ──▶ js/docs-setup.js + index.html
//!    │
//!    └──▶ todos::aggregate ──▶ partials/todo/index.html   (optional)
//!
//! then, optionally: inline::inline_partials
//! ```
//!
//! The record set is passed in explicitly and nothing is kept between runs
//! except what ends up in the destination, so several runs can be driven from
//! the same process one after the other. [`build_sections`] does that and
//! inlines once at the end, after every section's partials are on disk.

use crate::assets::{self, AssetError};
use crate::config::{self, ConfigError, SectionConfig, SiteConfig};
use crate::inline::{self, InlineError, InlineReport};
use crate::links::{CommitResolver, LinkError, LinkResolver};
use crate::manifest::{self, LoadOrigin, Manifest, ManifestError, WriteOptions};
use crate::naming;
use crate::render;
use crate::todos;
use crate::types::{DocRecord, ProjectMeta};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Link error: {0}")]
    Link(#[from] LinkError),
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
    #[error("Inline error: {0}")]
    Inline(#[from] InlineError),
    #[error("Invalid records in {path}: {source}")]
    Records {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Cannot read nav template {path}: {source}")]
    NavTemplate {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Everything a run needs besides its records.
pub struct RunContext<'a> {
    pub config: &'a SiteConfig,
    pub project: &'a ProjectMeta,
    pub commits: &'a dyn CommitResolver,
}

/// Outcome of the TODO index step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoOutcome {
    NotRequested,
    Empty,
    Found { todos: usize, files: usize },
}

/// What a run produced, for CLI output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub section: String,
    pub title: String,
    pub dest: PathBuf,
    pub origin: LoadOrigin,
    /// Partial files written, relative to `dest`.
    pub partials: Vec<String>,
    pub todos: TodoOutcome,
    pub todo_page_registered: bool,
    /// Number of partials embedded into `index.html`, when inlining ran.
    pub inlined: Option<usize>,
    pub elapsed: Duration,
}

/// What a multi-section build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteReport {
    pub runs: Vec<RunReport>,
    /// The single inlining pass after the last section, when requested.
    pub inlined: Option<InlineReport>,
}

/// Read Reader output files. Files that do not exist are skipped.
pub fn load_records(paths: &[PathBuf]) -> Result<Vec<DocRecord>, PipelineError> {
    let mut records = Vec::new();
    for path in paths {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Skipping missing record file");
            continue;
        }
        let content = fs::read_to_string(path)?;
        let mut batch: Vec<DocRecord> =
            serde_json::from_str(&content).map_err(|source| PipelineError::Records {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(path = %path.display(), records = batch.len(), "Loaded records");
        records.append(&mut batch);
    }
    Ok(records)
}

fn relative(dest: &Path, path: &Path) -> String {
    path.strip_prefix(dest)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Build one section of the site from `records`.
pub fn run(
    ctx: &RunContext,
    target: &str,
    mut records: Vec<DocRecord>,
) -> Result<RunReport, PipelineError> {
    let start = Instant::now();
    let config = ctx.config;
    let dest = config.dest.as_path();
    let section = config::section_key(target).to_string();
    let section_config = config
        .sections
        .get(&section)
        .cloned()
        .unwrap_or_else(SectionConfig::default);

    for record in &mut records {
        record.section = section.clone();
    }
    // first record with an id wins, for the partial as well as the manifest
    let mut seen = HashSet::new();
    records.retain(|record| {
        let first = seen.insert(record.id.clone());
        if !first {
            tracing::warn!(id = %record.id, section = %section, "Duplicate record id; keeping the first");
        }
        first
    });

    let links = LinkResolver::new(ctx.commits).prepare(
        ctx.project,
        &config.source_link,
        &config.edit_link,
    )?;

    let (mut site, origin) = Manifest::load(dest, config.shell.as_deref())?;
    let site_assets = assets::copy_assets(
        dest,
        &config.scripts,
        &config.styles,
        config.image.as_deref(),
    )?;
    site.set_section(
        &section,
        section_config.title(),
        section_config.is_api(&section),
    );

    let mut partials = Vec::with_capacity(records.len());
    for record in &records {
        let path = naming::partial_path(dest, &section, &record.id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, render::render_partial(record, &links).into_string())?;
        partials.push(relative(dest, &path));
    }

    site.merge(records.iter().map(DocRecord::metadata).collect(), &section);

    let todo_page_registered = (config.generate_partials_todo_index
        || config.do_not_generate_standard_index_html)
        && site.ensure_todo_page();

    let todos = if config.generate_partials_todo_index {
        let index = todos::aggregate(&records);
        let path = dest.join("partials/todo/index.html");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, todos::render_todo_page(index.as_ref()).into_string())?;
        match index {
            Some(index) => TodoOutcome::Found {
                todos: index.todo_count,
                files: index.file_count(),
            },
            None => TodoOutcome::Empty,
        }
    } else {
        TodoOutcome::NotRequested
    };

    let nav_content = match &config.nav_template {
        Some(path) => fs::read_to_string(path).map_err(|source| PipelineError::NavTemplate {
            path: path.clone(),
            source,
        })?,
        None => String::new(),
    };

    let title = config
        .title
        .clone()
        .unwrap_or_else(|| ctx.project.display_title());
    manifest::write(
        &mut site,
        dest,
        &WriteOptions {
            config,
            assets: &site_assets,
            title: &title,
            nav_content: &nav_content,
        },
    )?;

    let inlined = if config.inline_partials {
        let report = inline::inline_partials(&dest.join("index.html"), &dest.join("partials"))?;
        Some(report.partials.len())
    } else {
        None
    };

    tracing::info!(section = %section, pages = records.len(), "Section built");
    Ok(RunReport {
        section: section.clone(),
        title: section_config.title().to_string(),
        dest: dest.to_path_buf(),
        origin,
        partials,
        todos,
        todo_page_registered,
        inlined,
        elapsed: start.elapsed(),
    })
}

/// Load the records of a configured section and build it.
pub fn build_section(ctx: &RunContext, target: &str) -> Result<RunReport, PipelineError> {
    let section = ctx.config.section(target)?;
    let records = load_records(&section.src)?;
    run(ctx, target, records)
}

/// Build each of `targets` in turn.
///
/// With `inline_partials` set, the individual runs leave their partials on
/// disk and a single inlining pass runs after the last one, so every section
/// ends up in `index.html`.
pub fn build_sections(ctx: &RunContext, targets: &[String]) -> Result<SiteReport, PipelineError> {
    let config = SiteConfig {
        inline_partials: false,
        ..ctx.config.clone()
    };
    let per_run = RunContext {
        config: &config,
        project: ctx.project,
        commits: ctx.commits,
    };
    let runs = targets
        .iter()
        .map(|target| build_section(&per_run, target))
        .collect::<Result<Vec<_>, _>>()?;

    let inlined = if ctx.config.inline_partials && !runs.is_empty() {
        let dest = &config.dest;
        Some(inline::inline_partials(
            &dest.join("index.html"),
            &dest.join("partials"),
        )?)
    } else {
        None
    };
    Ok(SiteReport { runs, inlined })
}

/// Result of validating one configured section without building it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionCheck {
    pub key: String,
    pub title: String,
    pub is_api: bool,
    /// Each record file and whether it exists.
    pub files: Vec<(PathBuf, bool)>,
    pub records: usize,
}

/// Parse every configured section's records, reporting what a build would see.
pub fn check(config: &SiteConfig) -> Result<Vec<SectionCheck>, PipelineError> {
    let mut checks = Vec::with_capacity(config.sections.len());
    for (key, section) in &config.sections {
        let records = load_records(&section.src)?;
        checks.push(SectionCheck {
            key: key.clone(),
            title: section.title().to_string(),
            is_api: section.is_api(key),
            files: section.src.iter().map(|p| (p.clone(), p.exists())).collect(),
            records: records.len(),
        });
    }
    Ok(checks)
}
