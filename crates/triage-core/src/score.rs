use crate::config::{BlockerPolicy, ScoringConfig};
use crate::keywords::{extract_keywords, lowered};
use crate::task::Task;
use crate::types::TaskRef;
use crate::validate::ValidationResult;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// ScoreContext
// ---------------------------------------------------------------------------

pub struct ScoreContext<'a> {
    pub task: &'a Task,
    pub validation: Option<&'a ValidationResult>,
    /// Recently changed file paths from the repository.
    pub recent_paths: &'a [String],
    /// Lowercased title keywords.
    pub keywords: Vec<String>,
    pub now: DateTime<Utc>,
    pub settings: &'a ScoringConfig,
}

impl<'a> ScoreContext<'a> {
    pub fn new(
        task: &'a Task,
        recent_paths: &'a [String],
        now: DateTime<Utc>,
        settings: &'a ScoringConfig,
    ) -> Self {
        Self {
            task,
            validation: None,
            recent_paths,
            keywords: lowered(&extract_keywords(&task.title)),
            now,
            settings,
        }
    }

    pub fn with_validation(mut self, validation: &'a ValidationResult) -> Self {
        self.validation = Some(validation);
        self
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub signal: String,
    pub points: i64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTask {
    pub task: TaskRef,
    pub score: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contributions: Vec<Contribution>,
}

impl ScoredTask {
    pub fn has_signal(&self, id: &str) -> bool {
        self.contributions.iter().any(|c| c.signal == id)
    }
}

// ---------------------------------------------------------------------------
// Signal table
// ---------------------------------------------------------------------------

/// One row of the weighting table. `times` returns how many times the signal
/// fires (0 = not at all); only the blocker signal can fire more than once.
pub struct Signal {
    pub id: &'static str,
    pub points: i64,
    pub times: fn(&ScoreContext) -> u32,
    pub reason: fn(&ScoreContext) -> String,
}

macro_rules! signal {
    (id: $id:expr, points: $points:expr, when: $cond:expr, reason: $reason:expr) => {
        Signal {
            id: $id,
            points: $points,
            times: |ctx| u32::from(($cond)(ctx)),
            reason: $reason,
        }
    };
    (id: $id:expr, points: $points:expr, times: $times:expr, reason: $reason:expr) => {
        Signal {
            id: $id,
            points: $points,
            times: $times,
            reason: $reason,
        }
    };
}

fn blocks_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bblocks\s+#(\d+)").expect("valid regex"))
}

/// Distinct issue numbers referenced as `blocks #N` in the body.
pub fn blocked_issues(body: &str) -> BTreeSet<u64> {
    blocks_re()
        .captures_iter(body)
        .filter_map(|c| c.get(1)?.as_str().parse().ok())
        .collect()
}

fn blocker_times(ctx: &ScoreContext) -> u32 {
    let refs = blocked_issues(&ctx.task.body);
    match ctx.settings.blocker_policy {
        BlockerPolicy::Once => u32::from(!refs.is_empty()),
        BlockerPolicy::PerReference => u32::try_from(refs.len()).unwrap_or(u32::MAX),
    }
}

fn blocker_reason(ctx: &ScoreContext) -> String {
    let refs: Vec<String> = blocked_issues(&ctx.task.body)
        .into_iter()
        .map(|n| format!("#{n}"))
        .collect();
    format!("blocks {}", refs.join(", "))
}

/// Whether `kw` occurs in `path` as a whole word. Separators, the ends of
/// the path and camel-case humps all count as word boundaries, so `toggle`
/// matches `toggle_switch.rs` and `DarkModeToggle.tsx` but `mode` does not
/// match `model.rs`. Comparison is ASCII case-insensitive.
pub fn path_mentions(path: &str, kw: &str) -> bool {
    if kw.is_empty() {
        return false;
    }
    path.char_indices().any(|(start, first)| {
        let end = start + kw.len();
        let Some(candidate) = path.get(start..end) else {
            return false;
        };
        if !candidate.eq_ignore_ascii_case(kw) {
            return false;
        }
        let start_ok = match path[..start].chars().next_back() {
            None => true,
            Some(prev) => {
                !prev.is_alphanumeric() || (!prev.is_uppercase() && first.is_uppercase())
            }
        };
        let end_ok = match path[end..].chars().next() {
            None => true,
            Some(next) => {
                let last = candidate.chars().next_back().unwrap_or(first);
                !next.is_alphanumeric() || (!last.is_uppercase() && next.is_uppercase())
            }
        };
        start_ok && end_ok
    })
}

/// First recently changed path that mentions a title keyword.
fn recent_match<'c>(ctx: &'c ScoreContext) -> Option<(&'c str, &'c str)> {
    ctx.recent_paths.iter().find_map(|path| {
        ctx.keywords
            .iter()
            .find(|kw| path_mentions(path, kw))
            .map(|kw| (kw.as_str(), path.as_str()))
    })
}

/// Strictly older than the threshold, measured on the full duration rather
/// than on whole days.
fn is_aged_bug(ctx: &ScoreContext) -> bool {
    ctx.task.has_label("bug")
        && ctx.now - ctx.task.created_at > Duration::days(ctx.settings.aged_bug_days)
}

/// The weighting table. Every row is independent and additive: several
/// priority tiers on one task all count.
pub fn default_signals() -> Vec<Signal> {
    vec![
        signal!(
            id: "priority_critical",
            points: 100,
            when: |ctx: &ScoreContext| ctx.task.has_any_label(&["priority/critical", "P0"]),
            reason: |_| "critical priority label".to_string()
        ),
        signal!(
            id: "priority_high",
            points: 50,
            when: |ctx: &ScoreContext| ctx.task.has_any_label(&["priority/high", "P1"]),
            reason: |_| "high priority label".to_string()
        ),
        signal!(
            id: "priority_medium",
            points: 25,
            when: |ctx: &ScoreContext| ctx.task.has_any_label(&["priority/medium", "P2"]),
            reason: |_| "medium priority label".to_string()
        ),
        signal!(
            id: "blocker",
            points: 30,
            times: blocker_times,
            reason: blocker_reason
        ),
        signal!(
            id: "effort_small",
            points: 20,
            when: |ctx: &ScoreContext| ctx.task.has_label("effort/small"),
            reason: |_| "small effort".to_string()
        ),
        signal!(
            id: "effort_medium",
            points: 10,
            when: |ctx: &ScoreContext| ctx.task.has_label("effort/medium"),
            reason: |_| "medium effort".to_string()
        ),
        signal!(
            id: "effort_large",
            points: -10,
            when: |ctx: &ScoreContext| ctx.task.has_label("effort/large"),
            reason: |_| "large effort".to_string()
        ),
        signal!(
            id: "recent_work",
            points: 15,
            when: |ctx: &ScoreContext| recent_match(ctx).is_some(),
            reason: |ctx| match recent_match(ctx) {
                Some((kw, path)) => format!("'{kw}' appears in recently changed {path}"),
                None => String::new(),
            }
        ),
        signal!(
            id: "aged_bug",
            points: 10,
            when: is_aged_bug,
            reason: |ctx| format!("bug open for {} days", ctx.task.age_days(ctx.now))
        ),
        signal!(
            id: "impact_high",
            points: 25,
            when: |ctx: &ScoreContext| ctx.task.has_label("impact/high"),
            reason: |_| "high impact label".to_string()
        ),
    ]
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

pub struct Scorer {
    signals: Vec<Signal>,
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(default_signals())
    }
}

impl Scorer {
    pub fn new(signals: Vec<Signal>) -> Self {
        Self { signals }
    }

    pub fn score(&self, ctx: &ScoreContext) -> ScoredTask {
        let mut contributions = Vec::new();
        for signal in &self.signals {
            let times = (signal.times)(ctx);
            if times == 0 {
                continue;
            }
            let reason = (signal.reason)(ctx);
            for _ in 0..times {
                contributions.push(Contribution {
                    signal: signal.id.to_string(),
                    points: signal.points,
                    reason: reason.clone(),
                });
            }
        }
        ScoredTask {
            task: ctx.task.task_ref(),
            score: contributions.iter().map(|c| c.points).sum(),
            created_at: ctx.task.created_at,
            contributions,
        }
    }
}

/// Score with the default weighting table.
pub fn score_task(ctx: &ScoreContext) -> ScoredTask {
    Scorer::default().score(ctx)
}

/// Highest score first; ties go to the older task, then to the lower id so
/// the order is fully reproducible.
pub fn compare_ranked(a: &ScoredTask, b: &ScoredTask) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.task.cmp(&b.task))
}

pub fn rank(mut scored: Vec<ScoredTask>) -> Vec<ScoredTask> {
    scored.sort_by(compare_ranked);
    scored
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tracker;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn task(title: &str, labels: &[&str]) -> Task {
        Task::new(Tracker::Github, "1", title, now() - Duration::days(1))
            .with_labels(labels.iter().copied())
    }

    fn score(t: &Task, recent: &[String], settings: &ScoringConfig) -> ScoredTask {
        score_task(&ScoreContext::new(t, recent, now(), settings))
    }

    #[test]
    fn no_labels_no_body_scores_zero() {
        let t = task("Dark mode toggle", &[]);
        let s = score(&t, &[], &ScoringConfig::default());
        assert_eq!(s.score, 0);
        assert!(s.contributions.is_empty());
    }

    #[test]
    fn priority_tiers_stack() {
        let t = task("x", &["priority/critical", "priority/high"]);
        let s = score(&t, &[], &ScoringConfig::default());
        assert_eq!(s.score, 150);
        assert!(s.has_signal("priority_critical"));
        assert!(s.has_signal("priority_high"));
    }

    #[test]
    fn short_priority_aliases() {
        let cfg = ScoringConfig::default();
        assert_eq!(score(&task("x", &["P0"]), &[], &cfg).score, 100);
        assert_eq!(score(&task("x", &["p1"]), &[], &cfg).score, 50);
        assert_eq!(score(&task("x", &["P2"]), &[], &cfg).score, 25);
        // Both spellings of the same tier still count once.
        assert_eq!(score(&task("x", &["P0", "priority/critical"]), &[], &cfg).score, 100);
    }

    #[test]
    fn effort_and_impact() {
        let cfg = ScoringConfig::default();
        assert_eq!(score(&task("x", &["effort/small"]), &[], &cfg).score, 20);
        assert_eq!(score(&task("x", &["effort/medium"]), &[], &cfg).score, 10);
        assert_eq!(score(&task("x", &["effort/large"]), &[], &cfg).score, -10);
        assert_eq!(score(&task("x", &["impact/high"]), &[], &cfg).score, 25);
    }

    #[test]
    fn blocker_counted_once_by_default() {
        let t = task("x", &[]).with_body("This blocks #77. Also BLOCKS #77 and Blocks  #78.");
        let s = score(&t, &[], &ScoringConfig::default());
        assert_eq!(s.score, 30);
        assert_eq!(s.contributions.len(), 1);
        assert_eq!(s.contributions[0].reason, "blocks #77, #78");
    }

    #[test]
    fn blocker_per_reference_counts_distinct_numbers() {
        let cfg = ScoringConfig {
            blocker_policy: BlockerPolicy::PerReference,
            ..ScoringConfig::default()
        };
        let t = task("x", &[]).with_body("blocks #77\nblocks #77\nblocks #78");
        assert_eq!(score(&t, &[], &cfg).score, 60);

        let single = task("x", &[]).with_body("Blocks #77, blocks #77");
        assert_eq!(score(&single, &[], &cfg).score, 30);
    }

    #[test]
    fn blocker_needs_hash_number() {
        let cfg = ScoringConfig::default();
        let t = task("x", &[]).with_body("this blocks release; unblocks #5");
        assert_eq!(score(&t, &[], &cfg).score, 0);
    }

    #[test]
    fn recent_work_matches_keyword_in_path() {
        let t = task("Add dark mode toggle", &["effort/medium"]);
        let recent = vec!["src/components/Toggle.tsx".to_string(), "README.md".to_string()];
        let s = score(&t, &recent, &ScoringConfig::default());
        assert_eq!(s.score, 25);
        let recent_c = s
            .contributions
            .iter()
            .find(|c| c.signal == "recent_work")
            .unwrap();
        assert!(recent_c.reason.contains("toggle"));
        assert!(recent_c.reason.contains("src/components/Toggle.tsx"));
    }

    #[test]
    fn stop_words_do_not_trigger_recent_work() {
        let t = task("Fix the bug", &[]);
        let recent = vec!["src/fix.rs".to_string(), "src/bug.rs".to_string()];
        assert_eq!(score(&t, &recent, &ScoringConfig::default()).score, 0);
    }

    #[test]
    fn aged_bug_requires_more_than_threshold() {
        let cfg = ScoringConfig::default();
        let mut t = task("x", &["bug"]);
        t.created_at = now() - Duration::days(30);
        assert_eq!(score(&t, &[], &cfg).score, 0);
        t.created_at = now() - Duration::days(31);
        assert_eq!(score(&t, &[], &cfg).score, 10);

        let mut not_bug = task("x", &["enhancement"]);
        not_bug.created_at = now() - Duration::days(300);
        assert_eq!(score(&not_bug, &[], &cfg).score, 0);
    }

    #[test]
    fn aged_bug_counts_partial_days() {
        let cfg = ScoringConfig::default();
        let mut t = task("x", &["bug"]);
        t.created_at = now() - Duration::days(30) - Duration::hours(20);
        assert_eq!(t.age_days(now()), 30);
        let s = score(&t, &[], &cfg);
        assert_eq!(s.score, 10);
        assert!(s.has_signal("aged_bug"));

        t.created_at = now() - Duration::days(30) + Duration::minutes(1);
        assert_eq!(score(&t, &[], &cfg).score, 0);
    }

    #[test]
    fn recent_work_needs_whole_word_in_path() {
        let cfg = ScoringConfig::default();
        let t = task("Dark mode", &[]);
        let model = vec!["src/model.rs".to_string(), "src/modes_list.rs".to_string()];
        assert!(!score(&t, &model, &cfg).has_signal("recent_work"));

        let segment = vec!["src/ui/mode/switch.rs".to_string()];
        assert!(score(&t, &segment, &cfg).has_signal("recent_work"));
        let camel = vec!["web/DarkModePicker.tsx".to_string()];
        assert!(score(&t, &camel, &cfg).has_signal("recent_work"));
    }

    #[test]
    fn path_mentions_boundaries() {
        assert!(path_mentions("src/ui/toggle_switch.rs", "toggle"));
        assert!(path_mentions("src/components/Toggle.tsx", "toggle"));
        assert!(path_mentions("src/csv_export.rs", "csv_export"));
        assert!(path_mentions("DarkModeToggle.tsx", "mode"));
        assert!(!path_mentions("src/model.rs", "mode"));
        assert!(!path_mentions("src/remodel.rs", "model"));
        assert!(!path_mentions("src/x.rs", ""));
    }

    #[test]
    fn critical_small_high_impact_aged_bug() {
        let mut t = task(
            "Crash on startup",
            &["priority/critical", "effort/small", "impact/high", "bug"],
        );
        t.created_at = now() - Duration::days(40);
        let s = score(&t, &[], &ScoringConfig::default());
        assert_eq!(s.score, 155);
        assert_eq!(s.contributions.len(), 4);
    }

    #[test]
    fn rank_ties_prefer_older() {
        let a = ScoredTask {
            task: TaskRef::new(Tracker::Github, "A"),
            score: 60,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            contributions: vec![],
        };
        let b = ScoredTask {
            task: TaskRef::new(Tracker::Github, "B"),
            score: 60,
            created_at: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            contributions: vec![],
        };
        let c = ScoredTask {
            task: TaskRef::new(Tracker::Github, "C"),
            score: 90,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            contributions: vec![],
        };
        let ranked = rank(vec![b, a, c]);
        let ids: Vec<&str> = ranked.iter().map(|s| s.task.id.as_str()).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
    }

    #[test]
    fn custom_signal_table() {
        let scorer = Scorer::new(vec![signal!(
            id: "assigned",
            points: 5,
            when: |ctx: &ScoreContext| !ctx.task.assignees.is_empty(),
            reason: |_| "has an assignee".to_string()
        )]);
        let t = task("x", &["P0"]).with_assignees(["octocat"]);
        let cfg = ScoringConfig::default();
        let s = scorer.score(&ScoreContext::new(&t, &[], now(), &cfg));
        assert_eq!(s.score, 5);
    }
}
