use crate::output::{print_json, print_table};
use anyhow::Context;
use std::path::{Path, PathBuf};
use triage_core::pipeline::{collect_tasks, search_root, RunOptions};
use triage_core::present::render_warnings;
use triage_core::search::backend_for;
use triage_core::task;
use triage_core::validate::{ValidationResult, Validator};

pub fn run(
    root: &Path,
    config: Option<&Path>,
    id: Option<&str>,
    source_root: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let cfg = super::load_config(root, config)?;
    let set = collect_tasks(&cfg, root).context("failed to collect tasks")?;
    let unavailable = set.unavailable;
    let tasks = match id {
        Some(id) => vec![task::find(&set.tasks, id)?.clone()],
        None => set.tasks,
    };

    let options = RunOptions {
        source_root,
        ..RunOptions::default()
    };
    let search = backend_for(cfg.search.backend)?;
    let validator = Validator::new(
        search.as_ref(),
        &search_root(&cfg, root, &options),
        cfg.search.clone(),
    )?;
    let results = validator.validate_all(&tasks)?;

    if json {
        return print_json(&results);
    }

    let rows = results
        .iter()
        .map(|r| vec![r.task.to_string(), r.status.to_string(), files_cell(r)])
        .collect();
    print_table(&["TASK", "STATUS", "FILES"], rows);
    print!("{}", render_warnings(&unavailable));
    Ok(())
}

/// First few matched files, with a count of the rest.
fn files_cell(result: &ValidationResult) -> String {
    const SHOWN: usize = 3;
    let files: Vec<&String> = result.all_files().collect();
    if files.is_empty() {
        return "-".to_string();
    }
    let mut cell = files
        .iter()
        .take(SHOWN)
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    if files.len() > SHOWN {
        cell.push_str(&format!(" (+{})", files.len() - SHOWN));
    }
    cell
}
