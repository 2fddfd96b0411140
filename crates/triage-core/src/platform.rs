//! Environment probing for `triage doctor`.

use crate::config::{Config, SearchBackend, SourceConfig};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Platform detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub os: String,
    pub arch: String,
    /// CI provider when running under one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ci: Option<String>,
    pub git_repo: bool,
    /// Host of the `origin` remote (or the first remote), e.g. `github.com`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_host: Option<String>,
}

pub fn detect_platform(root: &Path) -> PlatformInfo {
    let git_config = std::fs::read_to_string(paths::git_config_path(root)).ok();
    PlatformInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        ci: detect_ci(|k| std::env::var(k).ok()),
        git_repo: root.join(paths::GIT_DIR).exists(),
        remote_host: git_config.as_deref().and_then(remote_host),
    }
}

const CI_VARS: &[(&str, &str)] = &[
    ("GITHUB_ACTIONS", "github-actions"),
    ("GITLAB_CI", "gitlab-ci"),
    ("BUILDKITE", "buildkite"),
    ("CI", "ci"),
];

pub fn detect_ci(var: impl Fn(&str) -> Option<String>) -> Option<String> {
    CI_VARS.iter().find_map(|(key, name)| {
        let value = var(key)?;
        let v = value.trim();
        (!v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false")).then(|| name.to_string())
    })
}

/// Remote host from the text of `.git/config`; `origin` wins over others.
pub fn remote_host(git_config: &str) -> Option<String> {
    let mut current_remote: Option<String> = None;
    let mut first: Option<String> = None;

    for line in git_config.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            current_remote = line
                .strip_prefix("[remote \"")
                .and_then(|rest| rest.strip_suffix("\"]"))
                .map(str::to_string);
            continue;
        }
        let Some(remote) = &current_remote else {
            continue;
        };
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.trim() != "url" {
            continue;
        }
        let Some(host) = url_host(value.trim()) else {
            continue;
        };
        if remote == "origin" {
            return Some(host);
        }
        first.get_or_insert(host);
    }
    first
}

/// Host part of an https, ssh or scp-style git URL.
fn url_host(url: &str) -> Option<String> {
    let rest = match url.split_once("://") {
        Some((_, rest)) => rest,
        // scp-like: git@github.com:owner/repo.git
        None if url.contains(':') => url,
        None => return None,
    };
    let rest = rest.rsplit_once('@').map(|(_, h)| h).unwrap_or(rest);
    let host = rest.split(['/', ':']).next()?.trim();
    (!host.is_empty()).then(|| host.to_ascii_lowercase())
}

// ---------------------------------------------------------------------------
// Tool verification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolStatus {
    pub name: String,
    pub purpose: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ToolStatus {
    pub fn available(&self) -> bool {
        self.path.is_some()
    }

    fn probe(name: &str, purpose: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            purpose: purpose.to_string(),
            required,
            path: which::which(name).ok(),
            note: None,
        }
    }
}

pub fn verify_tools(config: &Config) -> Vec<ToolStatus> {
    let uses_github = config
        .sources
        .all()
        .any(|s| matches!(s, SourceConfig::Github { .. }));
    let uses_rg = config.search.backend == SearchBackend::Ripgrep;

    let git = ToolStatus::probe("git", "recently changed files, review change sets", false);

    let mut gh = ToolStatus::probe("gh", "GitHub issues source", uses_github);
    if gh.available() && !gh_authenticated() {
        gh.note = Some("no gh auth session found; run 'gh auth login'".to_string());
    }

    let rg = ToolStatus::probe("rg", "ripgrep search backend", uses_rg);

    vec![git, gh, rg]
}

/// Required tools that are not installed.
pub fn missing_required(tools: &[ToolStatus]) -> Vec<&ToolStatus> {
    tools.iter().filter(|t| t.required && !t.available()).collect()
}

fn gh_authenticated() -> bool {
    let has_token = ["GH_TOKEN", "GITHUB_TOKEN"]
        .iter()
        .any(|k| std::env::var(k).map(|v| !v.trim().is_empty()).unwrap_or(false));
    has_token || gh_hosts_file().is_some_and(|p| p.exists())
}

/// `hosts.yml` written by `gh auth login`.
fn gh_hosts_file() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("GH_CONFIG_DIR") {
        return Some(PathBuf::from(dir).join("hosts.yml"));
    }
    let home = home::home_dir()?;
    Some(home.join(".config").join("gh").join("hosts.yml"))
}
