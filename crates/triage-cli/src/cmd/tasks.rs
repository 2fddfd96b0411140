use crate::output::{print_json, print_table, truncate};
use anyhow::Context;
use std::path::Path;
use triage_core::pipeline::collect_tasks;
use triage_core::present::render_warnings;

pub fn run(root: &Path, config: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let cfg = super::load_config(root, config)?;
    let set = collect_tasks(&cfg, root).context("failed to collect tasks")?;

    if json {
        let value = serde_json::json!({
            "tasks": set.tasks,
            "unavailable": set.unavailable,
        });
        return print_json(&value);
    }

    if set.tasks.is_empty() {
        println!("No open tasks.");
        print!("{}", render_warnings(&set.unavailable));
        return Ok(());
    }

    let rows = set
        .tasks
        .iter()
        .map(|t| {
            vec![
                t.task_ref().to_string(),
                truncate(&t.title, 60),
                t.labels.iter().cloned().collect::<Vec<_>>().join(","),
                t.linked.as_ref().map(|l| l.to_string()).unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["TASK", "TITLE", "LABELS", "LINKED"], rows);
    print!("{}", render_warnings(&set.unavailable));
    Ok(())
}
