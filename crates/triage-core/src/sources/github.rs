use super::TaskSource;
use crate::error::{Result, TriageError};
use crate::task::Task;
use crate::types::Tracker;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Command;

const GH_FIELDS: &str = "number,title,body,labels,assignees,createdAt,url";

/// Open GitHub issues, read through the `gh` CLI so authentication stays
/// with the user's existing `gh auth` session.
pub struct GithubSource {
    repo: Option<String>,
    limit: u32,
    dir: Option<PathBuf>,
}

impl GithubSource {
    pub fn new(repo: Option<String>, limit: u32) -> Self {
        Self {
            repo,
            limit,
            dir: None,
        }
    }

    /// Run `gh` from `dir` so it can infer the repository from the checkout.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "issue".to_string(),
            "list".to_string(),
            "--state".to_string(),
            "open".to_string(),
            "--json".to_string(),
            GH_FIELDS.to_string(),
            "--limit".to_string(),
            self.limit.to_string(),
        ];
        if let Some(repo) = &self.repo {
            args.push("--repo".to_string());
            args.push(repo.clone());
        }
        args
    }
}

impl TaskSource for GithubSource {
    fn tracker(&self) -> Tracker {
        Tracker::Github
    }

    fn name(&self) -> String {
        match &self.repo {
            Some(repo) => format!("github ({repo})"),
            None => "github".to_string(),
        }
    }

    fn fetch(&self) -> Result<Vec<Task>> {
        let gh = which::which("gh").map_err(|_| TriageError::ToolUnavailable("gh".to_string()))?;
        let mut cmd = Command::new(gh);
        cmd.args(self.args());
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }
        let output = cmd
            .output()
            .map_err(|e| TriageError::source_fetch(self.name(), e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TriageError::source_fetch(self.name(), stderr.trim().to_string()));
        }
        parse_issues(&String::from_utf8_lossy(&output.stdout))
    }
}

// ---------------------------------------------------------------------------
// gh JSON
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhIssue {
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    labels: Vec<GhLabel>,
    #[serde(default)]
    assignees: Vec<GhUser>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GhLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GhUser {
    login: String,
}

/// Parse the output of `gh issue list --json ...`.
pub fn parse_issues(json: &str) -> Result<Vec<Task>> {
    let issues: Vec<GhIssue> = serde_json::from_str(json)?;
    Ok(issues
        .into_iter()
        .map(|i| {
            let mut task = Task::new(Tracker::Github, i.number.to_string(), i.title, i.created_at)
                .with_body(i.body.unwrap_or_default())
                .with_labels(i.labels.into_iter().map(|l| l.name))
                .with_assignees(i.assignees.into_iter().map(|a| a.login));
            task.url = i.url;
            task
        })
        .collect())
}
