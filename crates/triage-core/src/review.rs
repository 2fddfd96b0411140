//! Bounded review loop over a change set.
//!
//! The reviewer and reviser are black boxes. In practice they are external
//! programs speaking a JSON stdin/stdout protocol:
//!
//! - reviewer request: `{"change_set": {..}, "criteria": [..]}`,
//!   response: `{"approved": bool, "requests": [..]}`
//! - reviser request: `{"change_set": {..}, "requests": [..]}`,
//!   response: the revised change set
//!
//! Stderr of both programs passes through to the terminal.

use crate::error::{Result, TriageError};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

// ---------------------------------------------------------------------------
// ChangeSet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub diff: String,
}

impl ChangeSet {
    /// Working tree changes relative to `base`.
    pub fn from_git(root: &Path, base: &str) -> Result<Self> {
        let files = git(root, &["diff", "--name-only", base])?;
        let diff = git(root, &["diff", base])?;
        Ok(Self {
            files: files
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            diff,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.diff.trim().is_empty()
    }
}

fn git(root: &Path, args: &[&str]) -> Result<String> {
    let git = which::which("git").map_err(|_| TriageError::ToolUnavailable("git".to_string()))?;
    let output = Command::new(git).args(args).current_dir(root).output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TriageError::Review(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "requests", rename_all = "snake_case")]
pub enum ReviewOutcome {
    Approved,
    RevisionsRequested(Vec<String>),
}

pub trait Reviewer {
    fn review(&self, change: &ChangeSet, criteria: &[String]) -> Result<ReviewOutcome>;
}

pub trait Reviser {
    fn revise(&mut self, change: &ChangeSet, requests: &[String]) -> Result<ChangeSet>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewReport {
    pub approved: bool,
    pub iterations: u32,
    /// Requests still open when the loop stopped.
    #[serde(default)]
    pub outstanding: Vec<String>,
    pub change: ChangeSet,
}

/// Review, revise, repeat. Stops on approval or after `max_iterations`
/// reviews; the last round's requests are reported as outstanding.
pub fn review_loop(
    reviewer: &dyn Reviewer,
    reviser: &mut dyn Reviser,
    change: ChangeSet,
    criteria: &[String],
    max_iterations: u32,
) -> Result<ReviewReport> {
    if max_iterations == 0 {
        return Err(TriageError::Review(
            "max_iterations must be at least 1".to_string(),
        ));
    }

    let mut current = change;
    let mut iterations = 0;
    loop {
        iterations += 1;
        let requests = match reviewer.review(&current, criteria)? {
            ReviewOutcome::Approved => Vec::new(),
            ReviewOutcome::RevisionsRequested(requests) => requests,
        };
        if requests.is_empty() {
            tracing::debug!(iterations, "change set approved");
            return Ok(ReviewReport {
                approved: true,
                iterations,
                outstanding: Vec::new(),
                change: current,
            });
        }
        if iterations >= max_iterations {
            tracing::warn!(
                iterations,
                outstanding = requests.len(),
                "review loop hit its iteration limit"
            );
            return Ok(ReviewReport {
                approved: false,
                iterations,
                outstanding: requests,
                change: current,
            });
        }
        tracing::debug!(iteration = iterations, requests = requests.len(), "revising");
        current = reviser.revise(&current, &requests)?;
    }
}

// ---------------------------------------------------------------------------
// External programs
// ---------------------------------------------------------------------------

/// Run `command` in `dir`, feed `request` as JSON on stdin and return stdout.
fn run_json<T: Serialize>(command: &[String], dir: &Path, request: &T) -> Result<String> {
    let (program, args) = command.split_first().ok_or_else(|| {
        TriageError::Configuration("review command is empty".to_string())
    })?;
    let resolved = which::which(program)
        .or_else(|_| which::which(dir.join(program)))
        .map_err(|_| TriageError::ToolUnavailable(program.clone()))?;

    let payload = serde_json::to_string(request)?;
    let mut child = Command::new(resolved)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| TriageError::Review(format!("failed to start {program}: {e}")))?;

    if let Some(stdin) = child.stdin.as_mut() {
        stdin
            .write_all(payload.as_bytes())
            .map_err(|e| TriageError::Review(format!("failed to write stdin of {program}: {e}")))?;
    }
    // Close stdin so the program sees EOF.
    drop(child.stdin.take());

    let output = child
        .wait_with_output()
        .map_err(|e| TriageError::Review(format!("{program}: {e}")))?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
        let hint: String = stdout.chars().take(500).collect();
        return Err(TriageError::Review(format!(
            "{program} exited with {}: {hint}",
            output.status
        )));
    }
    Ok(stdout)
}

#[derive(Serialize)]
struct ReviewRequest<'a> {
    change_set: &'a ChangeSet,
    criteria: &'a [String],
}

#[derive(Deserialize)]
struct ReviewResponse {
    approved: bool,
    #[serde(default)]
    requests: Vec<String>,
}

#[derive(Serialize)]
struct ReviseRequest<'a> {
    change_set: &'a ChangeSet,
    requests: &'a [String],
}

pub struct CommandReviewer {
    command: Vec<String>,
    dir: PathBuf,
}

impl CommandReviewer {
    pub fn new(command: Vec<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            dir: dir.into(),
        }
    }
}

impl Reviewer for CommandReviewer {
    fn review(&self, change: &ChangeSet, criteria: &[String]) -> Result<ReviewOutcome> {
        let stdout = run_json(
            &self.command,
            &self.dir,
            &ReviewRequest {
                change_set: change,
                criteria,
            },
        )?;
        let response: ReviewResponse = serde_json::from_str(stdout.trim())
            .map_err(|e| TriageError::Review(format!("reviewer returned invalid JSON: {e}")))?;
        Ok(if response.approved {
            ReviewOutcome::Approved
        } else {
            ReviewOutcome::RevisionsRequested(response.requests)
        })
    }
}

pub struct CommandReviser {
    command: Vec<String>,
    dir: PathBuf,
}

impl CommandReviser {
    pub fn new(command: Vec<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            dir: dir.into(),
        }
    }
}

impl Reviser for CommandReviser {
    fn revise(&mut self, change: &ChangeSet, requests: &[String]) -> Result<ChangeSet> {
        let stdout = run_json(
            &self.command,
            &self.dir,
            &ReviseRequest {
                change_set: change,
                requests,
            },
        )?;
        serde_json::from_str(stdout.trim())
            .map_err(|e| TriageError::Review(format!("reviser returned invalid JSON: {e}")))
    }
}

/// Stand-in reviser when none is configured: the change set is re-reviewed as is.
pub struct Unrevised;

impl Reviser for Unrevised {
    fn revise(&mut self, change: &ChangeSet, _requests: &[String]) -> Result<ChangeSet> {
        Ok(change.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Requests revisions until the change set mentions every criterion.
    struct CriteriaReviewer {
        calls: Cell<u32>,
    }

    impl Reviewer for CriteriaReviewer {
        fn review(&self, change: &ChangeSet, criteria: &[String]) -> Result<ReviewOutcome> {
            self.calls.set(self.calls.get() + 1);
            let missing: Vec<String> = criteria
                .iter()
                .filter(|c| !change.diff.contains(c.as_str()))
                .map(|c| format!("address {c}"))
                .collect();
            Ok(if missing.is_empty() {
                ReviewOutcome::Approved
            } else {
                ReviewOutcome::RevisionsRequested(missing)
            })
        }
    }

    /// Fixes one request per round.
    struct OneAtATime;

    impl Reviser for OneAtATime {
        fn revise(&mut self, change: &ChangeSet, requests: &[String]) -> Result<ChangeSet> {
            let mut next = change.clone();
            if let Some(first) = requests.first() {
                next.diff.push_str(first.trim_start_matches("address "));
                next.diff.push('\n');
            }
            Ok(next)
        }
    }

    fn reviewer() -> CriteriaReviewer {
        CriteriaReviewer {
            calls: Cell::new(0),
        }
    }

    fn criteria(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn approved_first_time() {
        let r = reviewer();
        let report = review_loop(&r, &mut OneAtATime, ChangeSet::default(), &[], 3).unwrap();
        assert!(report.approved);
        assert_eq!(report.iterations, 1);
        assert_eq!(r.calls.get(), 1);
    }

    #[test]
    fn converges_within_bound() {
        let r = reviewer();
        let report = review_loop(
            &r,
            &mut OneAtATime,
            ChangeSet::default(),
            &criteria(&["tests", "docs"]),
            3,
        )
        .unwrap();
        assert!(report.approved);
        assert_eq!(report.iterations, 3);
        assert!(report.change.diff.contains("docs"));
    }

    #[test]
    fn stops_after_max_iterations() {
        let r = reviewer();
        let report = review_loop(
            &r,
            &mut OneAtATime,
            ChangeSet::default(),
            &criteria(&["a1", "b2", "c3", "d4"]),
            3,
        )
        .unwrap();
        assert!(!report.approved);
        assert_eq!(report.iterations, 3);
        assert_eq!(r.calls.get(), 3);
        assert_eq!(report.outstanding, vec!["address c3", "address d4"]);
    }

    #[test]
    fn unrevised_never_converges() {
        let r = reviewer();
        let report = review_loop(
            &r,
            &mut Unrevised,
            ChangeSet::default(),
            &criteria(&["tests"]),
            3,
        )
        .unwrap();
        assert!(!report.approved);
        assert_eq!(report.iterations, 3);
    }

    #[test]
    fn zero_iterations_rejected() {
        let err = review_loop(&reviewer(), &mut Unrevised, ChangeSet::default(), &[], 0).unwrap_err();
        assert!(matches!(err, TriageError::Review(_)));
    }

    #[test]
    fn missing_program_is_tool_unavailable() {
        let dir = tempfile::TempDir::new().unwrap();
        let reviewer = CommandReviewer::new(
            vec!["triage-test-no-such-reviewer".to_string()],
            dir.path(),
        );
        let err = reviewer.review(&ChangeSet::default(), &[]).unwrap_err();
        assert!(matches!(err, TriageError::ToolUnavailable(_)));
    }

    #[cfg(unix)]
    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[cfg(unix)]
    #[test]
    fn command_reviewer_speaks_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let approve = CommandReviewer::new(
            sh(r#"cat >/dev/null; echo '{"approved": true}'"#),
            dir.path(),
        );
        assert_eq!(
            approve.review(&ChangeSet::default(), &[]).unwrap(),
            ReviewOutcome::Approved
        );

        let reject = CommandReviewer::new(
            sh(r#"cat >/dev/null; echo '{"approved": false, "requests": ["add tests"]}'"#),
            dir.path(),
        );
        assert_eq!(
            reject.review(&ChangeSet::default(), &[]).unwrap(),
            ReviewOutcome::RevisionsRequested(vec!["add tests".to_string()])
        );
    }

    #[cfg(unix)]
    #[test]
    fn command_reviewer_receives_change_set() {
        let dir = tempfile::TempDir::new().unwrap();
        // Approves only when the request carries the expected file.
        let reviewer = CommandReviewer::new(
            sh(r#"if grep -q 'src/lib.rs' ; then echo '{"approved": true}'; else echo '{"approved": false, "requests": ["missing"]}'; fi"#),
            dir.path(),
        );
        let change = ChangeSet {
            files: vec!["src/lib.rs".to_string()],
            diff: String::new(),
        };
        assert_eq!(reviewer.review(&change, &[]).unwrap(), ReviewOutcome::Approved);
    }

    #[cfg(unix)]
    #[test]
    fn command_reviser_returns_change_set() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut reviser = CommandReviser::new(
            sh(r#"cat >/dev/null; echo '{"files": ["src/a.rs"], "diff": "+fixed"}'"#),
            dir.path(),
        );
        let next = reviser
            .revise(&ChangeSet::default(), &["fix it".to_string()])
            .unwrap();
        assert_eq!(next.files, vec!["src/a.rs"]);
        assert_eq!(next.diff, "+fixed");
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_review_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let reviewer = CommandReviewer::new(sh("cat >/dev/null; exit 3"), dir.path());
        let err = reviewer.review(&ChangeSet::default(), &[]).unwrap_err();
        assert!(matches!(err, TriageError::Review(_)));
    }

    #[cfg(unix)]
    #[test]
    fn invalid_json_is_review_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let reviewer = CommandReviewer::new(sh("cat >/dev/null; echo nope"), dir.path());
        assert!(matches!(
            reviewer.review(&ChangeSet::default(), &[]),
            Err(TriageError::Review(_))
        ));
    }
}
