use crate::config::SearchConfig;
use crate::error::Result;
use crate::keywords::extract_keywords;
use crate::search::{companion_test_candidates, ensure_search_root, is_test_path, CodeSearch, SearchQuery};
use crate::task::Task;
use crate::types::{TaskRef, ValidationStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ValidationResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub task: TaskRef,
    pub status: ValidationStatus,
    /// Non-test files containing a title keyword, sorted.
    #[serde(default)]
    pub evidence: Vec<String>,
    /// Test files that match a keyword or accompany an evidence file.
    #[serde(default)]
    pub tests: Vec<String>,
    /// Keywords the search ran with.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ValidationResult {
    pub fn pending(task: TaskRef) -> Self {
        Self {
            task,
            status: ValidationStatus::Pending,
            evidence: Vec::new(),
            tests: Vec::new(),
            keywords: Vec::new(),
        }
    }

    /// Every file that contributed to the verdict.
    pub fn all_files(&self) -> impl Iterator<Item = &String> {
        self.evidence.iter().chain(self.tests.iter())
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Read-only code-presence check of tasks against one source tree.
pub struct Validator<'a> {
    search: &'a dyn CodeSearch,
    root: PathBuf,
    settings: SearchConfig,
}

impl<'a> Validator<'a> {
    /// Fails with a configuration error when `root` is not a directory, so a
    /// bad path is reported once instead of per task.
    pub fn new(search: &'a dyn CodeSearch, root: &Path, settings: SearchConfig) -> Result<Self> {
        ensure_search_root(root)?;
        Ok(Self {
            search,
            root: root.to_path_buf(),
            settings,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn validate(&self, task: &Task) -> Result<ValidationResult> {
        let keywords = extract_keywords(&task.title);
        if keywords.is_empty() {
            tracing::debug!(task = %task.task_ref(), "no searchable keywords, treating as pending");
            return Ok(ValidationResult::pending(task.task_ref()));
        }
        let keyword_texts: Vec<String> = keywords.iter().map(|k| k.text.clone()).collect();

        let query = SearchQuery::new(keywords, &self.settings);
        let hits = self.search.search(&self.root, &query)?;
        tracing::debug!(
            task = %task.task_ref(),
            backend = self.search.name(),
            hits = hits.len(),
            "validated"
        );

        let mut evidence: BTreeSet<String> = BTreeSet::new();
        let mut tests: BTreeSet<String> = BTreeSet::new();
        for hit in hits {
            if is_test_path(&hit.path) {
                tests.insert(hit.path);
            } else {
                evidence.insert(hit.path);
            }
        }
        for source in &evidence {
            for candidate in companion_test_candidates(source) {
                if self.root.join(&candidate).is_file() {
                    tests.insert(candidate);
                }
            }
        }

        let status = classify(!evidence.is_empty(), !tests.is_empty());
        Ok(ValidationResult {
            task: task.task_ref(),
            status,
            evidence: evidence.into_iter().collect(),
            tests: tests.into_iter().collect(),
            keywords: keyword_texts,
        })
    }

    pub fn validate_all(&self, tasks: &[Task]) -> Result<Vec<ValidationResult>> {
        tasks.iter().map(|t| self.validate(t)).collect()
    }
}

/// Source and tests present: done. Only one of them: partial. Neither: pending.
fn classify(has_source: bool, has_tests: bool) -> ValidationStatus {
    match (has_source, has_tests) {
        (true, true) => ValidationStatus::AppearsDone,
        (false, false) => ValidationStatus::Pending,
        _ => ValidationStatus::PartiallyDone,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
