use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const TRIAGE_DIR: &str = ".triage";
pub const CONFIG_FILE: &str = ".triage/config.yaml";

pub const GIT_DIR: &str = ".git";
pub const GIT_CONFIG: &str = ".git/config";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn triage_dir(root: &Path) -> PathBuf {
    root.join(TRIAGE_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn git_config_path(root: &Path) -> PathBuf {
    root.join(GIT_CONFIG)
}

/// Resolve `path` against `root` unless it is already absolute.
pub fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Render `path` relative to `root` with `/` separators, for stable output
/// across platforms.
pub fn display_relative(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
