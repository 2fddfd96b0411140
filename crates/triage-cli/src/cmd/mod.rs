pub mod config;
pub mod doctor;
pub mod init;
pub mod recommend;
pub mod review;
pub mod score;
pub mod tasks;
pub mod validate;

use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};
use triage_core::config::Config;
use triage_core::paths;
use triage_core::pipeline::RunOptions;

/// Load the explicit `--config` file, or `<root>/.triage/config.yaml`
/// (defaults when absent).
pub fn load_config(root: &Path, explicit: Option<&Path>) -> anyhow::Result<Config> {
    match explicit {
        Some(p) => {
            let path = paths::resolve(root, p);
            Config::load_from(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))
        }
        None => Config::load(root).context("failed to load config"),
    }
}

/// Flags shared by the commands that validate and score tasks.
#[derive(Args, Debug, Default)]
pub struct EvalArgs {
    /// Recently changed file path (repeatable); skips reading git history
    #[arg(long = "recent", value_name = "PATH")]
    pub recent: Vec<String>,

    /// Look-back window for recently changed files, in days
    #[arg(long)]
    pub since_days: Option<u32>,

    /// Source tree to search (default: search.root or the project root)
    #[arg(long, value_name = "DIR")]
    pub source_root: Option<PathBuf>,
}

impl EvalArgs {
    pub fn options(&self) -> RunOptions {
        RunOptions {
            recent: (!self.recent.is_empty()).then(|| self.recent.clone()),
            since_days: self.since_days,
            source_root: self.source_root.clone(),
            ..RunOptions::default()
        }
    }
}

