use crate::error::{Result, TriageError};
use crate::types::{TaskRef, Tracker};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub tracker: Tracker,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    #[serde(default)]
    pub assignees: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Cross-reference to the same logical task in a secondary source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked: Option<TaskRef>,
}

impl Task {
    pub fn new(
        tracker: Tracker,
        id: impl Into<String>,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            tracker,
            title: title.into(),
            body: String::new(),
            labels: BTreeSet::new(),
            assignees: BTreeSet::new(),
            created_at,
            url: None,
            linked: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels.extend(labels.into_iter().map(Into::into));
        self
    }

    pub fn with_assignees<I, S>(mut self, assignees: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assignees.extend(assignees.into_iter().map(Into::into));
        self
    }

    pub fn task_ref(&self) -> TaskRef {
        TaskRef::new(self.tracker, self.id.clone())
    }

    /// Label lookup is case-insensitive: trackers disagree on `P0` vs `p0`.
    pub fn has_label(&self, name: &str) -> bool {
        let name = name.trim();
        self.labels
            .iter()
            .any(|l| l.trim().eq_ignore_ascii_case(name))
    }

    pub fn has_any_label(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.has_label(n))
    }

    /// Whole days between creation and `now`, clamped at zero. Display only;
    /// thresholds compare the full duration.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days().max(0)
    }
}

/// Drop tasks whose id repeats within one source, keeping the first.
pub fn dedupe_ids(tasks: Vec<Task>, source_name: &str) -> Vec<Task> {
    let mut seen: HashSet<String> = HashSet::new();
    tasks
        .into_iter()
        .filter(|t| {
            let fresh = seen.insert(t.id.clone());
            if !fresh {
                tracing::warn!(source = source_name, id = %t.id, "duplicate task id dropped");
            }
            fresh
        })
        .collect()
}

pub fn find<'a>(tasks: &'a [Task], id: &str) -> Result<&'a Task> {
    tasks
        .iter()
        .find(|t| t.id == id || t.task_ref().to_string() == id)
        .ok_or_else(|| TriageError::TaskNotFound(id.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
