use crate::error::{Result, TriageError};
use std::collections::BTreeSet;
use std::path::Path;
use std::process::Command;

/// Files touched by commits in the last `days` days, de-duplicated and sorted.
pub fn recent_paths(root: &Path, days: u32) -> Result<Vec<String>> {
    let git = which::which("git").map_err(|_| TriageError::ToolUnavailable("git".to_string()))?;
    let output = Command::new(git)
        .args([
            "log",
            &format!("--since={days} days ago"),
            "--name-only",
            "--pretty=format:",
        ])
        .current_dir(root)
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TriageError::Configuration(format!(
            "git log failed in {}: {}",
            root.display(),
            stderr.trim()
        )));
    }

    let paths = parse_name_only(&String::from_utf8_lossy(&output.stdout));
    tracing::debug!(days, count = paths.len(), "collected recently changed paths");
    Ok(paths)
}

/// Parse `git log --name-only --pretty=format:` output.
pub fn parse_name_only(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
