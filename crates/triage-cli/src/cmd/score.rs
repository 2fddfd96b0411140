use super::EvalArgs;
use crate::output::{print_json, print_table, truncate};
use anyhow::Context;
use std::path::Path;
use triage_core::pipeline::{assess_tasks, collect_tasks, Evaluation};
use triage_core::present::render_warnings;
use triage_core::task;

pub fn run(
    root: &Path,
    config: Option<&Path>,
    id: Option<&str>,
    eval: &EvalArgs,
    json: bool,
) -> anyhow::Result<()> {
    let cfg = super::load_config(root, config)?;
    let set = collect_tasks(&cfg, root).context("failed to collect tasks")?;
    let tasks = match id {
        Some(id) => vec![task::find(&set.tasks, id)?.clone()],
        None => set.tasks,
    };

    let mut warnings = set.unavailable;
    let evaluations = assess_tasks(&cfg, root, &eval.options(), &tasks, &mut warnings)?;

    if json {
        let scores: Vec<serde_json::Value> = evaluations
            .iter()
            .map(|e| {
                serde_json::json!({
                    "task": e.task.task_ref(),
                    "title": e.task.title,
                    "score": e.scored.score,
                    "status": e.validation.status,
                    "contributions": e.scored.contributions,
                })
            })
            .collect();
        let value = serde_json::json!({
            "scores": scores,
            "unavailable": warnings,
        });
        return print_json(&value);
    }

    if id.is_some() {
        if let Some(e) = evaluations.first() {
            print_breakdown(e);
        }
        print!("{}", render_warnings(&warnings));
        return Ok(());
    }

    let rows = evaluations
        .iter()
        .enumerate()
        .map(|(i, e)| {
            vec![
                (i + 1).to_string(),
                e.task.task_ref().to_string(),
                e.scored.score.to_string(),
                e.validation.status.to_string(),
                truncate(&e.task.title, 50),
                e.scored
                    .contributions
                    .iter()
                    .map(|c| format!("{}{:+}", c.signal, c.points))
                    .collect::<Vec<_>>()
                    .join(" "),
            ]
        })
        .collect();
    print_table(&["#", "TASK", "SCORE", "STATUS", "TITLE", "SIGNALS"], rows);
    print!("{}", render_warnings(&warnings));
    Ok(())
}

fn print_breakdown(e: &Evaluation) {
    println!("{}  {}", e.task.task_ref(), e.task.title);
    println!("score:  {}", e.scored.score);
    println!("status: {}", e.validation.status);
    for c in &e.scored.contributions {
        println!("  {:+4}  {:<18} {}", c.points, c.signal, c.reason);
    }
}
