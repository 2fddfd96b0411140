use std::path::{Path, PathBuf};
use triage_core::paths::{GIT_DIR, TRIAGE_DIR};

/// Resolve the project root.
///
/// Priority:
/// 1. `--root` flag / `TRIAGE_ROOT` env var (passed in as `explicit`)
/// 2. Nearest ancestor of cwd containing `.triage/`
/// 3. Nearest ancestor of cwd containing `.git/`
/// 4. cwd
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_root_from(&cwd)
}

fn find_root_from(start: &Path) -> PathBuf {
    for marker in [TRIAGE_DIR, GIT_DIR] {
        if let Some(dir) = start.ancestors().find(|d| d.join(marker).is_dir()) {
            return dir.to_path_buf();
        }
    }
    start.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn finds_triage_dir_above_cwd() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".triage")).unwrap();
        let deep = dir.path().join("src/deep");
        std::fs::create_dir_all(&deep).unwrap();
        assert_eq!(find_root_from(&deep), dir.path());
    }

    #[test]
    fn triage_dir_beats_git_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let nested = dir.path().join("services/api");
        std::fs::create_dir_all(nested.join(".triage")).unwrap();
        std::fs::create_dir_all(nested.join("src")).unwrap();
        assert_eq!(find_root_from(&nested.join("src")), nested);
    }

    #[test]
    fn falls_back_to_git_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let sub = dir.path().join("pkg");
        std::fs::create_dir_all(&sub).unwrap();
        assert_eq!(find_root_from(&sub), dir.path());
    }
}
