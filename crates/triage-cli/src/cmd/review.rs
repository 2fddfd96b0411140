use crate::output::print_json;
use anyhow::Context;
use std::path::Path;
use triage_core::review::{
    review_loop, ChangeSet, CommandReviewer, CommandReviser, Reviser, Unrevised,
};

pub struct ReviewArgs {
    pub base: Option<String>,
    pub criteria: Vec<String>,
    pub max_iterations: Option<u32>,
}

pub fn run(root: &Path, config: Option<&Path>, args: ReviewArgs, json: bool) -> anyhow::Result<()> {
    let cfg = super::load_config(root, config)?;
    let settings = &cfg.review;
    if settings.command.is_empty() {
        anyhow::bail!("review.command is not configured; set it in .triage/config.yaml");
    }

    let base = args.base.unwrap_or_else(|| settings.base.clone());
    let criteria = if args.criteria.is_empty() {
        settings.criteria.clone()
    } else {
        args.criteria
    };
    let max_iterations = args.max_iterations.unwrap_or(settings.max_iterations);

    let change = ChangeSet::from_git(root, &base)
        .with_context(|| format!("failed to collect changes against {base}"))?;
    if change.is_empty() {
        println!("No changes against {base}.");
        return Ok(());
    }

    let reviewer = CommandReviewer::new(settings.command.clone(), root);
    let mut reviser: Box<dyn Reviser> = if settings.reviser.is_empty() {
        Box::new(Unrevised)
    } else {
        Box::new(CommandReviser::new(settings.reviser.clone(), root))
    };

    let report = review_loop(&reviewer, reviser.as_mut(), change, &criteria, max_iterations)?;

    if json {
        print_json(&serde_json::json!({
            "approved": report.approved,
            "iterations": report.iterations,
            "outstanding": report.outstanding,
            "files": report.change.files,
        }))?;
    } else if report.approved {
        println!("Approved after {} iteration(s).", report.iterations);
    } else {
        println!("Not approved after {} iteration(s). Outstanding:", report.iterations);
        for r in &report.outstanding {
            println!("  - {r}");
        }
    }

    if !report.approved {
        anyhow::bail!(
            "review not approved after {} iteration(s)",
            report.iterations
        );
    }
    Ok(())
}
