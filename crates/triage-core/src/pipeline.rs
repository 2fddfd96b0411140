//! One triage pass: aggregate, de-duplicate, validate, score, rank, present.
//!
//! Everything is derived fresh per call; nothing is cached between runs.

use crate::config::{Config, ScoringConfig};
use crate::dedup::merge_sources;
use crate::error::Result;
use crate::present::Report;
use crate::recent;
use crate::score::{compare_ranked, ScoreContext, ScoredTask, Scorer};
use crate::search::backend_for;
use crate::sources::{aggregate_configured, SourceWarning};
use crate::task::Task;
use crate::validate::{ValidationResult, Validator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub task: Task,
    pub validation: ValidationResult,
    pub scored: ScoredTask,
}

pub struct EvalInputs<'a> {
    pub validator: &'a Validator<'a>,
    pub recent_paths: &'a [String],
    pub now: DateTime<Utc>,
    pub scoring: &'a ScoringConfig,
}

/// Validate and score every task, then rank by score (ties: older first).
pub fn evaluate(tasks: &[Task], inputs: &EvalInputs) -> Result<Vec<Evaluation>> {
    let scorer = Scorer::default();
    let mut evaluations = Vec::with_capacity(tasks.len());
    for task in tasks {
        let validation = inputs.validator.validate(task)?;
        let ctx = ScoreContext::new(task, inputs.recent_paths, inputs.now, inputs.scoring)
            .with_validation(&validation);
        let scored = scorer.score(&ctx);
        evaluations.push(Evaluation {
            task: task.clone(),
            validation,
            scored,
        });
    }
    evaluations.sort_by(|a, b| compare_ranked(&a.scored, &b.scored));
    Ok(evaluations)
}

// ---------------------------------------------------------------------------
// Full run
// ---------------------------------------------------------------------------

/// Per-invocation overrides of the configured behaviour.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub top: Option<usize>,
    /// Recently changed paths supplied by the caller; skips `git log`.
    pub recent: Option<Vec<String>>,
    pub since_days: Option<u32>,
    pub source_root: Option<PathBuf>,
    /// Reference time for age-based signals; defaults to now.
    pub now: Option<DateTime<Utc>>,
}

/// Tasks after aggregation and de-duplication.
#[derive(Debug, Clone)]
pub struct TaskSet {
    pub tasks: Vec<Task>,
    pub unavailable: Vec<SourceWarning>,
}

pub fn collect_tasks(config: &Config, root: &Path) -> Result<TaskSet> {
    let threshold = config.dedup.threshold()?;
    let aggregation = aggregate_configured(&config.sources, root)?;
    let fetched = aggregation.task_count();
    let tasks = merge_sources(aggregation.batches, threshold);
    tracing::debug!(fetched, merged = tasks.len(), "aggregated tasks");
    Ok(TaskSet {
        tasks,
        unavailable: aggregation.unavailable,
    })
}

/// Source tree the validator scans.
pub fn search_root(config: &Config, root: &Path, options: &RunOptions) -> PathBuf {
    match &options.source_root {
        Some(p) => crate::paths::resolve(root, p),
        None => config.search.source_root(root),
    }
}

/// Recently changed paths: caller-supplied, else git history. Missing git
/// history degrades to no recent-work signal with a warning.
fn resolve_recent(
    config: &Config,
    root: &Path,
    options: &RunOptions,
    warnings: &mut Vec<SourceWarning>,
) -> Vec<String> {
    if let Some(paths) = &options.recent {
        return paths.clone();
    }
    let days = options.since_days.unwrap_or(config.recent.days);
    match recent::recent_paths(root, days) {
        Ok(paths) => paths,
        Err(e) => {
            tracing::warn!("recent changes unavailable, skipping recent-work signal: {e}");
            warnings.push(SourceWarning {
                source: "git history".to_string(),
                message: format!("recent changes unavailable, skipping recent-work signal: {e}"),
            });
            Vec::new()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Assessment {
    pub evaluations: Vec<Evaluation>,
    pub unavailable: Vec<SourceWarning>,
}

/// Aggregate, de-duplicate, validate and score, without the top-N cutoff.
pub fn assess(config: &Config, root: &Path, options: &RunOptions) -> Result<Assessment> {
    let TaskSet {
        tasks,
        mut unavailable,
    } = collect_tasks(config, root)?;
    assess_tasks(config, root, options, &tasks, &mut unavailable).map(|evaluations| Assessment {
        evaluations,
        unavailable,
    })
}

/// Validate and score an already collected task list.
pub fn assess_tasks(
    config: &Config,
    root: &Path,
    options: &RunOptions,
    tasks: &[Task],
    warnings: &mut Vec<SourceWarning>,
) -> Result<Vec<Evaluation>> {
    let recent_paths = resolve_recent(config, root, options, warnings);

    let search = backend_for(config.search.backend)?;
    let validator = Validator::new(
        search.as_ref(),
        &search_root(config, root, options),
        config.search.clone(),
    )?;

    let inputs = EvalInputs {
        validator: &validator,
        recent_paths: &recent_paths,
        now: options.now.unwrap_or_else(Utc::now),
        scoring: &config.scoring,
    };
    evaluate(tasks, &inputs)
}

/// The whole recommendation pass.
pub fn run(config: &Config, root: &Path, options: &RunOptions) -> Result<Report> {
    let assessment = assess(config, root, options)?;
    let top = options.top.unwrap_or(config.present.top);
    Ok(Report::new(
        &assessment.evaluations,
        top,
        assessment.unavailable,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
