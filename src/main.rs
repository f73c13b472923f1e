use clap::{Parser, Subcommand};
use docsite::links::GitCommitResolver;
use docsite::pipeline::{self, RunContext};
use docsite::types::ProjectMeta;
use docsite::{config, inline, output};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docsite")]
#[command(about = "Documentation site generator for AngularJS-style API docs")]
#[command(long_about = "\
Documentation site generator for AngularJS-style API docs

Turns parsed documentation records into a browsable single-page site. Each
build run writes one section; runs into the same destination accumulate.

Site layout:

  docs/
  ├── index.html                 # Site shell, regenerated every run
  ├── js/docs-setup.js           # Manifest: NG_DOCS={sections, pages, ...};
  ├── js/docs.js                 # Loader
  ├── css/docs.css
  ├── grunt-scripts/             # Copied user scripts
  └── partials/
      ├── api/ng.filter.html     # One partial per record
      └── todo/index.html        # TODO index (optional)

Record files are JSON arrays of records, listed per section in the config:

  [sections.api]
  src = [\"build/api.json\"]

Run 'docsite gen-config' to generate a documented docsite.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Log progress at info level (otherwise RUST_LOG applies)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build one section, or every configured section in turn
    Build {
        /// Section to build; `all` builds the api section
        #[arg(long)]
        section: Option<String>,
    },
    /// Embed all partials into index.html and delete them
    Inline,
    /// Validate config and record files without building
    Check,
    /// Print a stock docsite.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Build { section } => {
            let site_config = config::load_config(&cli.config)?;
            let project = ProjectMeta::load(&site_config.project);
            let commits = GitCommitResolver::default();
            let ctx = RunContext {
                config: &site_config,
                project: &project,
                commits: &commits,
            };
            let targets: Vec<String> = match section {
                Some(target) => vec![target],
                None => site_config.sections.keys().cloned().collect(),
            };
            if targets.is_empty() {
                return Err(format!(
                    "no sections configured in {}; add a [sections.api] table",
                    cli.config.display()
                )
                .into());
            }
            println!("==> Building {}", targets.join(", "));
            let site = pipeline::build_sections(&ctx, &targets)?;
            for report in &site.runs {
                output::print_run_output(report);
            }
            if let Some(inlined) = &site.inlined {
                output::print_inline_output(inlined);
            }
        }
        Command::Inline => {
            let site_config = config::load_config(&cli.config)?;
            let dest = &site_config.dest;
            let report = inline::inline_partials(&dest.join("index.html"), &dest.join("partials"))?;
            output::print_inline_output(&report);
        }
        Command::Check => {
            println!("==> Checking {}", cli.config.display());
            let site_config = config::load_config(&cli.config)?;
            let checks = pipeline::check(&site_config)?;
            output::print_check_output(&checks);
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
