//! Code search backends used by the validator.
//!
//! Two implementations share the [`CodeSearch`] trait:
//! - [`BuiltinSearch`] walks the tree in-process with the `ignore` crate
//!   (gitignore-aware) and matches whole words with `regex`.
//! - [`RipgrepSearch`] shells out to `rg`. A missing binary surfaces as
//!   [`TriageError::ToolUnavailable`] rather than an empty result.

use crate::config::{SearchBackend, SearchConfig};
use crate::error::{Result, TriageError};
use crate::keywords::Keyword;
use crate::paths;
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub keywords: Vec<Keyword>,
    /// Applies to plain words; symbols are always case-sensitive.
    pub case_sensitive: bool,
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
}

impl SearchQuery {
    pub fn new(keywords: Vec<Keyword>, cfg: &SearchConfig) -> Self {
        Self {
            keywords,
            case_sensitive: cfg.case_sensitive,
            extensions: cfg.extensions.clone(),
            exclude: cfg.exclude.clone(),
        }
    }

    fn is_case_sensitive(&self, kw: &Keyword) -> bool {
        kw.symbol || self.case_sensitive
    }
}

/// A file containing at least one keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Path relative to the search root, `/`-separated.
    pub path: String,
    pub keywords: Vec<String>,
}

pub trait CodeSearch {
    fn name(&self) -> &str;

    /// Files under `root` containing any of the query keywords, sorted by path.
    fn search(&self, root: &Path, query: &SearchQuery) -> Result<Vec<SearchHit>>;
}

/// Select the configured backend. Fails up front when the backend's tool is
/// missing.
pub fn backend_for(backend: SearchBackend) -> Result<Box<dyn CodeSearch>> {
    match backend {
        SearchBackend::Builtin => Ok(Box::new(BuiltinSearch)),
        SearchBackend::Ripgrep => Ok(Box::new(RipgrepSearch::locate()?)),
    }
}

pub fn ensure_search_root(root: &Path) -> Result<()> {
    if !root.is_dir() {
        return Err(TriageError::Configuration(format!(
            "source tree '{}' does not exist or is not a directory",
            root.display()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// BuiltinSearch
// ---------------------------------------------------------------------------

pub struct BuiltinSearch;

impl CodeSearch for BuiltinSearch {
    fn name(&self) -> &str {
        "builtin"
    }

    fn search(&self, root: &Path, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        ensure_search_root(root)?;
        if query.keywords.is_empty() {
            return Ok(Vec::new());
        }

        let matchers = query
            .keywords
            .iter()
            .map(|kw| word_regex(&kw.text, query.is_case_sensitive(kw)).map(|re| (kw.text.clone(), re)))
            .collect::<Result<Vec<(String, Regex)>>>()?;

        let mut builder = WalkBuilder::new(root);
        builder.hidden(true).require_git(false);
        if !query.exclude.is_empty() {
            let mut overrides = OverrideBuilder::new(root);
            for glob in &query.exclude {
                overrides
                    .add(&format!("!{glob}"))
                    .map_err(|e| TriageError::Configuration(format!("bad exclude glob '{glob}': {e}")))?;
            }
            let built = overrides
                .build()
                .map_err(|e| TriageError::Configuration(e.to_string()))?;
            builder.overrides(built);
        }

        let mut hits = Vec::new();
        let mut files_searched = 0usize;
        for entry in builder.build() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!("skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.path();
            if !extension_allowed(path, &query.extensions) {
                continue;
            }
            let Ok(Some(content)) = crate::io::read_text(path) else {
                continue;
            };
            files_searched += 1;

            let matched: Vec<String> = matchers
                .iter()
                .filter(|(_, re)| re.is_match(&content))
                .map(|(text, _)| text.clone())
                .collect();
            if !matched.is_empty() {
                hits.push(SearchHit {
                    path: paths::display_relative(root, path),
                    keywords: matched,
                });
            }
        }

        hits.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::debug!(
            backend = "builtin",
            files_searched,
            files_matched = hits.len(),
            "search complete"
        );
        Ok(hits)
    }
}

fn word_regex(text: &str, case_sensitive: bool) -> Result<Regex> {
    RegexBuilder::new(&format!(r"\b{}\b", regex::escape(text)))
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| TriageError::Search(e.to_string()))
}

fn extension_allowed(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
}

// ---------------------------------------------------------------------------
// RipgrepSearch
// ---------------------------------------------------------------------------

pub struct RipgrepSearch {
    bin: PathBuf,
}

impl RipgrepSearch {
    pub fn locate() -> Result<Self> {
        let bin = which::which("rg").map_err(|_| TriageError::ToolUnavailable("rg".to_string()))?;
        Ok(Self { bin })
    }

    fn args_for(&self, kw: &Keyword, query: &SearchQuery) -> Vec<String> {
        let mut args = vec![
            "--files-with-matches".to_string(),
            "--no-messages".to_string(),
            "--word-regexp".to_string(),
            "--fixed-strings".to_string(),
        ];
        if query.is_case_sensitive(kw) {
            args.push("--case-sensitive".to_string());
        } else {
            args.push("--ignore-case".to_string());
        }
        for ext in &query.extensions {
            args.push("--glob".to_string());
            args.push(format!("*.{ext}"));
        }
        for glob in &query.exclude {
            args.push("--glob".to_string());
            args.push(format!("!{glob}"));
        }
        args.push("--".to_string());
        args.push(kw.text.clone());
        args.push(".".to_string());
        args
    }
}

impl CodeSearch for RipgrepSearch {
    fn name(&self) -> &str {
        "ripgrep"
    }

    fn search(&self, root: &Path, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        ensure_search_root(root)?;

        let mut by_path: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for kw in &query.keywords {
            let output = Command::new(&self.bin)
                .args(self.args_for(kw, query))
                .current_dir(root)
                .output()
                .map_err(|e| TriageError::Search(format!("failed to run rg: {e}")))?;

            // rg exits 1 when nothing matched; only 2+ is a real failure.
            match output.status.code() {
                Some(0) | Some(1) => {}
                _ => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(TriageError::Search(stderr.trim().to_string()));
                }
            }

            for path in parse_rg_files(&String::from_utf8_lossy(&output.stdout)) {
                by_path.entry(path).or_default().push(kw.text.clone());
            }
        }

        Ok(by_path
            .into_iter()
            .map(|(path, keywords)| SearchHit { path, keywords })
            .collect())
    }
}

/// Normalise `rg --files-with-matches` output to `/`-separated relative paths.
pub fn parse_rg_files(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            let l = l.replace('\\', "/");
            l.strip_prefix("./").map(str::to_string).unwrap_or(l)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Test-file conventions
// ---------------------------------------------------------------------------

const TEST_DIRS: &[&str] = &["test", "tests", "__tests__", "spec", "specs"];

/// True when `path` follows a common test-file naming convention.
pub fn is_test_path(path: &str) -> bool {
    let normalized = path.replace('\\', "/");
    let mut parts: Vec<&str> = normalized.split('/').collect();
    let Some(file) = parts.pop() else {
        return false;
    };
    if parts.iter().any(|d| TEST_DIRS.contains(d)) {
        return true;
    }
    let stem = file.split('.').next().unwrap_or(file);
    stem.starts_with("test_")
        || stem.ends_with("_test")
        || stem.ends_with("_spec")
        || stem.ends_with("Test")
        || stem.ends_with("Tests")
        || file.contains(".test.")
        || file.contains(".spec.")
}

/// Conventional companion test locations for a source file, relative to the
/// search root.
pub fn companion_test_candidates(path: &str) -> Vec<String> {
    let normalized = path.replace('\\', "/");
    let (dir, file) = match normalized.rsplit_once('/') {
        Some((d, f)) => (format!("{d}/"), f.to_string()),
        None => (String::new(), normalized.clone()),
    };
    let (stem, ext) = match file.rsplit_once('.') {
        Some((s, e)) => (s.to_string(), format!(".{e}")),
        None => (file.clone(), String::new()),
    };

    vec![
        format!("{dir}{stem}_test{ext}"),
        format!("{dir}{stem}.test{ext}"),
        format!("{dir}{stem}.spec{ext}"),
        format!("{dir}test_{stem}{ext}"),
        format!("{dir}{stem}Test{ext}"),
        format!("{dir}__tests__/{stem}.test{ext}"),
        format!("{dir}tests/{stem}{ext}"),
        format!("tests/{stem}{ext}"),
        format!("tests/{stem}_test{ext}"),
        format!("tests/test_{stem}{ext}"),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/ui")).unwrap();
        fs::create_dir_all(root.join("target/debug")).unwrap();
        fs::write(root.join("src/ui/theme.rs"), "pub struct ThemeSwitcher;\n// dark palette\n").unwrap();
        fs::write(root.join("src/ui/Dark.rs"), "// Dark background\n").unwrap();
        fs::write(root.join("src/lib.rs"), "mod ui; // darkness falls\n").unwrap();
        fs::write(root.join("target/debug/gen.rs"), "// dark build output\n").unwrap();
        fs::write(root.join("README.md"), "dark mode docs\n").unwrap();
        dir
    }

    fn query(words: &[Keyword], case_sensitive: bool) -> SearchQuery {
        SearchQuery {
            keywords: words.to_vec(),
            case_sensitive,
            extensions: vec!["rs".to_string()],
            exclude: vec!["target/".to_string()],
        }
    }

    #[test]
    fn builtin_matches_whole_words_case_sensitively() {
        let dir = fixture();
        let hits = BuiltinSearch
            .search(dir.path(), &query(&[Keyword::word("dark")], true))
            .unwrap();
        let paths: Vec<&str> = hits.iter().map(|h| h.path.as_str()).collect();
        // "darkness" is not a whole-word match, "Dark" differs in case,
        // target/ is excluded and README.md is filtered by extension.
        assert_eq!(paths, vec!["src/ui/theme.rs"]);
    }

    #[test]
    fn builtin_case_insensitive_words() {
        let dir = fixture();
        let hits = BuiltinSearch
            .search(dir.path(), &query(&[Keyword::word("dark")], false))
            .unwrap();
        let paths: Vec<&str> = hits.iter().map(|h| h.path.as_str()).collect();
        assert_eq!(paths, vec!["src/ui/Dark.rs", "src/ui/theme.rs"]);
    }

    #[test]
    fn builtin_symbols_stay_case_sensitive() {
        let dir = fixture();
        let hits = BuiltinSearch
            .search(dir.path(), &query(&[Keyword::symbol("themeSwitcher")], false))
            .unwrap();
        assert!(hits.is_empty());
        let hits = BuiltinSearch
            .search(dir.path(), &query(&[Keyword::symbol("ThemeSwitcher")], false))
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].keywords, vec!["ThemeSwitcher".to_string()]);
    }

    #[test]
    fn builtin_invalid_root_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = BuiltinSearch
            .search(&missing, &query(&[Keyword::word("x")], true))
            .unwrap_err();
        assert!(matches!(err, TriageError::Configuration(_)));
    }

    #[test]
    fn empty_extension_list_searches_everything() {
        let dir = fixture();
        let mut q = query(&[Keyword::word("mode")], true);
        q.extensions.clear();
        let hits = BuiltinSearch.search(dir.path(), &q).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "README.md");
    }

    #[test]
    fn parse_rg_files_strips_dot_prefix() {
        let out = "./src/a.rs\nsrc\\b.rs\n\n";
        assert_eq!(parse_rg_files(out), vec!["src/a.rs", "src/b.rs"]);
    }

    #[test]
    fn ripgrep_args_include_filters() {
        let rg = RipgrepSearch {
            bin: PathBuf::from("rg"),
        };
        let q = query(&[Keyword::word("dark")], false);
        let args = rg.args_for(&q.keywords[0], &q);
        assert!(args.contains(&"--ignore-case".to_string()));
        assert!(args.contains(&"*.rs".to_string()));
        assert!(args.contains(&"!target/".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("."));
    }

    #[test]
    fn test_path_conventions() {
        for p in [
            "tests/toggle.rs",
            "src/__tests__/Toggle.tsx",
            "src/toggle_test.go",
            "src/toggle.test.ts",
            "src/toggle.spec.js",
            "pkg/test_toggle.py",
            "src/ToggleTest.java",
        ] {
            assert!(is_test_path(p), "{p} should be a test path");
        }
        for p in ["src/toggle.rs", "src/testing.rs", "contest/entry.rs"] {
            assert!(!is_test_path(p), "{p} should not be a test path");
        }
    }

    #[test]
    fn companion_candidates_cover_common_layouts() {
        let c = companion_test_candidates("src/ui/toggle.ts");
        assert!(c.contains(&"src/ui/toggle.test.ts".to_string()));
        assert!(c.contains(&"src/ui/__tests__/toggle.test.ts".to_string()));
        assert!(c.contains(&"tests/toggle.ts".to_string()));
        assert!(c.iter().all(|p| is_test_path(p)));
    }
}
