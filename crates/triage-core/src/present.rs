//! Top-N recommendations with the reasoning behind each score.

use crate::pipeline::Evaluation;
use crate::score::Contribution;
use crate::sources::SourceWarning;
use crate::types::{TaskRef, ValidationStatus};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// 1-based position in the presented list.
    pub rank: usize,
    pub task: TaskRef,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    pub score: i64,
    #[serde(default)]
    pub contributions: Vec<Contribution>,
    pub status: ValidationStatus,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub tests: Vec<String>,
}

impl Recommendation {
    fn from_evaluation(rank: usize, e: &Evaluation) -> Self {
        Self {
            rank,
            task: e.task.task_ref(),
            title: e.task.title.clone(),
            url: e.task.url.clone(),
            labels: e.task.labels.iter().cloned().collect(),
            score: e.scored.score,
            contributions: e.scored.contributions.clone(),
            status: e.validation.status,
            evidence: e.validation.evidence.clone(),
            tests: e.validation.tests.clone(),
        }
    }
}

/// Drop tasks that already appear done and keep the first `top` of the
/// ranked list.
pub fn recommend(evaluations: &[Evaluation], top: usize) -> Vec<Recommendation> {
    evaluations
        .iter()
        .filter(|e| e.validation.status != ValidationStatus::AppearsDone)
        .take(top)
        .enumerate()
        .map(|(i, e)| Recommendation::from_evaluation(i + 1, e))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub recommendations: Vec<Recommendation>,
    /// Tasks scored after de-duplication.
    pub considered: usize,
    /// Tasks left out because their implementation appears to exist.
    pub appears_done: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable: Vec<SourceWarning>,
}

impl Report {
    pub fn new(evaluations: &[Evaluation], top: usize, unavailable: Vec<SourceWarning>) -> Self {
        Self {
            recommendations: recommend(evaluations, top),
            considered: evaluations.len(),
            appears_done: evaluations
                .iter()
                .filter(|e| e.validation.status == ValidationStatus::AppearsDone)
                .count(),
            unavailable,
        }
    }
}

pub fn render_text(report: &Report) -> String {
    let mut out = String::new();

    if report.recommendations.is_empty() {
        out.push_str("No open tasks to recommend.\n");
    } else {
        let _ = writeln!(
            out,
            "Top {} of {} task(s), {} skipped as already done",
            report.recommendations.len(),
            report.considered,
            report.appears_done
        );
    }

    for rec in &report.recommendations {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{}. [{}] {}  (score {}, {})",
            rec.rank, rec.task, rec.title, rec.score, rec.status
        );
        if let Some(url) = &rec.url {
            let _ = writeln!(out, "   {url}");
        }
        if !rec.labels.is_empty() {
            let _ = writeln!(out, "   labels: {}", rec.labels.join(", "));
        }
        if rec.contributions.is_empty() {
            let _ = writeln!(out, "   no scoring signals");
        }
        for c in &rec.contributions {
            let _ = writeln!(out, "   {:+4}  {:<18} {}", c.points, c.signal, c.reason);
        }
        if !rec.evidence.is_empty() {
            let _ = writeln!(out, "   evidence: {}", rec.evidence.join(", "));
        }
        if !rec.tests.is_empty() {
            let _ = writeln!(out, "   tests: {}", rec.tests.join(", "));
        }
    }

    out.push_str(&render_warnings(&report.unavailable));
    out
}

/// Notes for sources that could not be read, preceded by a blank line.
/// Empty when every source answered.
pub fn render_warnings(unavailable: &[SourceWarning]) -> String {
    let mut out = String::new();
    if unavailable.is_empty() {
        return out;
    }
    let _ = writeln!(out);
    for w in unavailable {
        let _ = writeln!(out, "warning: {}: {}", w.source, w.message);
    }
    out
}
