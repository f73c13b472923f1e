//! # docsite
//!
//! Turns parsed documentation records into a browsable single-page
//! documentation site for AngularJS-style projects.
//!
//! # Architecture: One Section Per Run
//!
//! A Reader (outside this crate) parses source comments into records and
//! writes them as JSON. Each build run takes the records of one section and
//! writes them into a destination directory that may already hold other
//! sections:
//!
//! ```text
//! records ─▶ partials/<section>/<id>.html   (one HTML fragment per record)
//!         ─▶ js/docs-setup.js                (manifest of every page, all sections)
//!         ─▶ index.html                      (site shell, regenerated)
//! ```
//!
//! The manifest is read back at the start of every run and the current
//! section's pages replace its previous ones, so runs accumulate a site.
//! Running the same input twice produces byte-identical output.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | One build run: sequences every step below |
//! | [`types`] | Records as the Reader writes them, page metadata, project descriptor |
//! | [`links`] | Source and edit link templates, repository host detection |
//! | [`render`] | Partial fragment per record, with source and edit links |
//! | [`todos`] | `@todo` aggregation and the TODO index page |
//! | [`manifest`] | The `NG_DOCS=...;` manifest: load, merge, save |
//! | [`index_page`] | `index.html` template rendering |
//! | [`assets`] | Site shell seeding and script, style and image copying |
//! | [`inline`] | Collapse every partial into `index.html` |
//! | [`naming`] | Record id to partial file name |
//! | [`config`] | `docsite.toml` loading, stock defaults, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Data-Only Manifest
//!
//! The manifest is a JavaScript assignment, but it is only ever written and
//! read as JSON wrapped in `NG_DOCS=` and `;`. Nothing is evaluated, and keys
//! starting with `__` never reach the file.
//!
//! ## Maud For Fragments
//!
//! Partials, the TODO page and the index substitutions are produced with
//! [Maud](https://maud.lambda.xyz/), so every configured value is escaped.
//! The record HTML itself is the Reader's output and is inserted as is.
//!
//! ## Explicit Run Inputs
//!
//! Records, config, project descriptor and commit lookup are all passed into
//! [`pipeline::run`]. Nothing is global, so tests drive runs directly against a
//! temporary directory with a stub [`links::CommitResolver`].

pub mod assets;
pub mod config;
pub mod index_page;
pub mod inline;
pub mod links;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod todos;
pub mod types;
