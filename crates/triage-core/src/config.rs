use crate::error::{Result, TriageError};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// SourceConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// GitHub issues through the `gh` CLI.
    Github {
        /// `owner/name`; omitted means the repository `gh` infers from cwd.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        repo: Option<String>,
        #[serde(default = "default_fetch_limit")]
        limit: u32,
    },
    /// Linear issues over GraphQL.
    Linear {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        team: Option<String>,
        #[serde(default = "default_linear_endpoint")]
        endpoint: String,
        #[serde(default = "default_linear_key_env")]
        api_key_env: String,
        #[serde(default = "default_fetch_limit")]
        limit: u32,
    },
    /// Markdown planning document with `- [ ]` checklist items.
    Plan { path: PathBuf },
    /// JSON or YAML file holding a list of task records.
    File { path: PathBuf },
}

fn default_fetch_limit() -> u32 {
    100
}

fn default_linear_endpoint() -> String {
    "https://api.linear.app/graphql".to_string()
}

fn default_linear_key_env() -> String {
    "LINEAR_API_KEY".to_string()
}

impl SourceConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceConfig::Github { .. } => "github",
            SourceConfig::Linear { .. } => "linear",
            SourceConfig::Plan { .. } => "plan",
            SourceConfig::File { .. } => "file",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_primary")]
    pub primary: SourceConfig,
    #[serde(default)]
    pub secondary: Vec<SourceConfig>,
}

fn default_primary() -> SourceConfig {
    SourceConfig::Github {
        repo: None,
        limit: default_fetch_limit(),
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            secondary: Vec::new(),
        }
    }
}

impl SourcesConfig {
    pub fn all(&self) -> impl Iterator<Item = &SourceConfig> {
        std::iter::once(&self.primary).chain(self.secondary.iter())
    }
}

// ---------------------------------------------------------------------------
// SearchConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchBackend {
    /// In-process gitignore-aware walk.
    #[default]
    Builtin,
    /// External `rg` binary.
    Ripgrep,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub backend: SearchBackend,
    /// Source tree to scan; relative paths resolve against the project root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// File extensions to search, without the dot. Empty means all files.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Glob patterns excluded from the search.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,
}

fn default_extensions() -> Vec<String> {
    [
        "rs", "go", "py", "ts", "tsx", "js", "jsx", "java", "kt", "rb", "swift", "c", "h", "cpp",
        "cs", "php", "vue", "svelte",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_exclude() -> Vec<String> {
    ["target/", "node_modules/", "dist/", "vendor/", ".triage/"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_case_sensitive() -> bool {
    true
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: SearchBackend::default(),
            root: None,
            extensions: default_extensions(),
            exclude: default_exclude(),
            case_sensitive: default_case_sensitive(),
        }
    }
}

impl SearchConfig {
    pub fn source_root(&self, project_root: &Path) -> PathBuf {
        match &self.root {
            Some(p) => paths::resolve(project_root, p),
            None => project_root.to_path_buf(),
        }
    }
}

// ---------------------------------------------------------------------------
// ScoringConfig
// ---------------------------------------------------------------------------

/// How repeated `blocks #N` references in a body are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockerPolicy {
    /// +30 once if any reference is present.
    #[default]
    Once,
    /// +30 for each distinct referenced issue number.
    PerReference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub blocker_policy: BlockerPolicy,
    #[serde(default = "default_aged_bug_days")]
    pub aged_bug_days: i64,
}

fn default_aged_bug_days() -> i64 {
    30
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            blocker_policy: BlockerPolicy::default(),
            aged_bug_days: default_aged_bug_days(),
        }
    }
}

// ---------------------------------------------------------------------------
// DedupConfig / PresentConfig / RecentConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Minimum token Jaccard overlap for two titles to be the same task.
    #[serde(default = "default_similarity")]
    pub similarity: f64,
}

fn default_similarity() -> f64 {
    0.6
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity: default_similarity(),
        }
    }
}

impl DedupConfig {
    /// The similarity threshold, rejected unless it lies in (0, 1]. At or
    /// below zero every pair of titles would merge.
    pub fn threshold(&self) -> Result<f64> {
        if self.similarity > 0.0 && self.similarity <= 1.0 {
            Ok(self.similarity)
        } else {
            Err(TriageError::Configuration(format!(
                "dedup.similarity must be in (0, 1], got {}",
                self.similarity
            )))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentConfig {
    #[serde(default = "default_top")]
    pub top: usize,
}

fn default_top() -> usize {
    5
}

impl Default for PresentConfig {
    fn default() -> Self {
        Self { top: default_top() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentConfig {
    /// Look-back window for "recently changed" files.
    #[serde(default = "default_recent_days")]
    pub days: u32,
}

fn default_recent_days() -> u32 {
    14
}

impl Default for RecentConfig {
    fn default() -> Self {
        Self {
            days: default_recent_days(),
        }
    }
}

// ---------------------------------------------------------------------------
// ReviewConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Program (and args) that reviews a change set over stdin/stdout JSON.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    /// Program that applies revision requests and returns a new change set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reviser: Vec<String>,
    #[serde(default)]
    pub criteria: Vec<String>,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_base")]
    pub base: String,
}

fn default_max_iterations() -> u32 {
    3
}

fn default_base() -> String {
    "main".to_string()
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            reviser: Vec::new(),
            criteria: Vec::new(),
            max_iterations: default_max_iterations(),
            base: default_base(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub present: PresentConfig,
    #[serde(default)]
    pub recent: RecentConfig,
    #[serde(default)]
    pub review: ReviewConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            sources: SourcesConfig::default(),
            search: SearchConfig::default(),
            scoring: ScoringConfig::default(),
            dedup: DedupConfig::default(),
            present: PresentConfig::default(),
            recent: RecentConfig::default(),
            review: ReviewConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `<root>/.triage/config.yaml`, falling back to defaults when the
    /// project was never initialised.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::new());
        }
        Self::load_from(&path)
    }

    /// Load an explicit config file; a missing file is an error here.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TriageError::Configuration(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        crate::io::atomic_write(&path, self.to_yaml()?.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // 1. Dedup threshold must be a usable ratio
        if let Err(TriageError::Configuration(message)) = self.dedup.threshold() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message,
            });
        }

        // 2. Presenter must show something
        if self.present.top == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "present.top is 0: no recommendations would be shown".to_string(),
            });
        }

        // 3. Review loop bounds
        if self.review.max_iterations == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "review.max_iterations must be at least 1".to_string(),
            });
        } else if self.review.max_iterations > 10 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "review.max_iterations={} (>10 is unusual)",
                    self.review.max_iterations
                ),
            });
        }

        if self.scoring.aged_bug_days < 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "scoring.aged_bug_days must not be negative, got {}",
                    self.scoring.aged_bug_days
                ),
            });
        }

        // 4. Source-specific checks
        for source in self.sources.all() {
            match source {
                SourceConfig::Plan { path } if path.as_os_str().is_empty() => {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Error,
                        message: "plan source has an empty path".to_string(),
                    });
                }
                SourceConfig::File { path } => {
                    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                    if !matches!(ext, "json" | "yaml" | "yml") {
                        warnings.push(ConfigWarning {
                            level: WarnLevel::Error,
                            message: format!(
                                "file source '{}' must be .json, .yaml or .yml",
                                path.display()
                            ),
                        });
                    }
                }
                SourceConfig::Github { limit, .. } | SourceConfig::Linear { limit, .. }
                    if *limit == 0 =>
                {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!("{} source has limit 0 and will fetch nothing", source.kind()),
                    });
                }
                _ => {}
            }
        }

        // 5. Ripgrep backend needs the binary
        if self.search.backend == SearchBackend::Ripgrep && which::which("rg").is_err() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "search.backend is ripgrep but 'rg' is not on PATH".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
