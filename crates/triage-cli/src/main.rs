mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, EvalArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "triage",
    about = "Pick the next task worth doing: aggregate tracker issues, check the code for them, rank by priority",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .triage/ or .git/)
    #[arg(long, global = true, env = "TRIAGE_ROOT")]
    root: Option<PathBuf>,

    /// Config file (default: <root>/.triage/config.yaml)
    #[arg(long, global = true, env = "TRIAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Debug logging on stderr
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .triage/config.yaml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// List aggregated, de-duplicated tasks
    Tasks,

    /// Check whether tasks already appear implemented in the source tree
    Validate {
        /// Task id (`42` or `github:42`); omit for all tasks
        id: Option<String>,

        /// Source tree to search (default: search.root or the project root)
        #[arg(long, value_name = "DIR")]
        source_root: Option<PathBuf>,
    },

    /// Show the full ranked score table with per-signal breakdown
    Score {
        /// Task id (`42` or `github:42`); omit for all tasks
        id: Option<String>,

        #[command(flatten)]
        eval: EvalArgs,
    },

    /// Recommend the top tasks to work on next
    Recommend {
        /// Number of recommendations (default: present.top)
        #[arg(long)]
        top: Option<usize>,

        #[command(flatten)]
        eval: EvalArgs,
    },

    /// Show or validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Detect the platform and verify required tools
    Doctor,

    /// Run the bounded review loop over the current change set
    Review {
        /// Base ref to diff against (default: review.base)
        #[arg(long)]
        base: Option<String>,

        /// Review criterion (repeatable; default: review.criteria)
        #[arg(long = "criteria", value_name = "C")]
        criteria: Vec<String>,

        /// Maximum review rounds (default: review.max_iterations)
        #[arg(long)]
        max_iterations: Option<u32>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Init { force } => cmd::init::run(&root, force),
        Commands::Tasks => cmd::tasks::run(&root, config, cli.json),
        Commands::Validate { id, source_root } => {
            cmd::validate::run(&root, config, id.as_deref(), source_root, cli.json)
        }
        Commands::Score { id, eval } => cmd::score::run(&root, config, id.as_deref(), &eval, cli.json),
        Commands::Recommend { top, eval } => cmd::recommend::run(&root, config, top, &eval, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, config, subcommand, cli.json),
        Commands::Doctor => cmd::doctor::run(&root, config, cli.json),
        Commands::Review {
            base,
            criteria,
            max_iterations,
        } => cmd::review::run(
            &root,
            config,
            cmd::review::ReviewArgs {
                base,
                criteria,
                max_iterations,
            },
            cli.json,
        ),
    };

    if let Err(e) = result {
        // Full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
