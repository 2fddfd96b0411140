use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tracker {
    Github,
    Linear,
    Plan,
    File,
}

impl Tracker {
    pub fn all() -> &'static [Tracker] {
        &[Tracker::Github, Tracker::Linear, Tracker::Plan, Tracker::File]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tracker::Github => "github",
            Tracker::Linear => "linear",
            Tracker::Plan => "plan",
            Tracker::File => "file",
        }
    }
}

impl fmt::Display for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tracker {
    type Err = crate::error::TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github" => Ok(Tracker::Github),
            "linear" => Ok(Tracker::Linear),
            "plan" => Ok(Tracker::Plan),
            "file" => Ok(Tracker::File),
            other => Err(crate::error::TriageError::InvalidValue {
                field: "tracker".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// TaskRef
// ---------------------------------------------------------------------------

/// Identity of a task inside the source it was fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskRef {
    pub tracker: Tracker,
    pub id: String,
}

impl TaskRef {
    pub fn new(tracker: Tracker, id: impl Into<String>) -> Self {
        Self {
            tracker,
            id: id.into(),
        }
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tracker, self.id)
    }
}

// ---------------------------------------------------------------------------
// ValidationStatus
// ---------------------------------------------------------------------------

/// Tri-state outcome of the code-presence check. Deliberately not a
/// probability: the heuristics behind it are file matches, not evidence weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Pending,
    AppearsDone,
    PartiallyDone,
}

impl ValidationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationStatus::Pending => "pending",
            ValidationStatus::AppearsDone => "appears-done",
            ValidationStatus::PartiallyDone => "partially-done",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_from_str_accepts_all_names() {
        for &t in Tracker::all() {
            let parsed: Tracker = t.as_str().parse().unwrap();
            assert_eq!(parsed, t);
        }
    }

    #[test]
    fn tracker_from_str_rejects_unknown() {
        assert!("jira".parse::<Tracker>().is_err());
    }

    #[test]
    fn task_ref_display() {
        let r = TaskRef::new(Tracker::Github, "42");
        assert_eq!(r.to_string(), "github:42");
    }

    #[test]
    fn validation_status_display_uses_hyphens() {
        assert_eq!(ValidationStatus::AppearsDone.to_string(), "appears-done");
        assert_eq!(ValidationStatus::PartiallyDone.to_string(), "partially-done");
        let json = serde_json::to_string(&ValidationStatus::AppearsDone).unwrap();
        assert_eq!(json, "\"appears_done\"");
    }
}
