//! Task sources: trackers and documents that yield task records.
//!
//! The primary source is mandatory; secondary sources are best-effort. A
//! failing secondary is logged, recorded as a [`SourceWarning`] and skipped.

pub mod file;
pub mod github;
pub mod linear;
pub mod plan;

use crate::config::{SourceConfig, SourcesConfig};
use crate::dedup::SourceBatch;
use crate::error::{Result, TriageError};
use crate::paths;
use crate::task::{dedupe_ids, Task};
use crate::types::Tracker;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use file::FileSource;
pub use github::GithubSource;
pub use linear::LinearSource;
pub use plan::PlanSource;

pub trait TaskSource {
    fn tracker(&self) -> Tracker;

    /// Human-readable label used in logs and warnings.
    fn name(&self) -> String;

    fn fetch(&self) -> Result<Vec<Task>>;
}

/// A secondary source that could not be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceWarning {
    pub source: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Aggregation {
    /// Primary batch first, then each secondary that answered.
    pub batches: Vec<SourceBatch>,
    pub unavailable: Vec<SourceWarning>,
}

impl Aggregation {
    pub fn task_count(&self) -> usize {
        self.batches.iter().map(|b| b.tasks.len()).sum()
    }
}

/// Build the source described by `cfg`; relative paths resolve against `root`.
pub fn source_from_config(cfg: &SourceConfig, root: &Path) -> Box<dyn TaskSource> {
    match cfg {
        SourceConfig::Github { repo, limit } => {
            Box::new(GithubSource::new(repo.clone(), *limit).in_dir(root))
        }
        SourceConfig::Linear {
            team,
            endpoint,
            api_key_env,
            limit,
        } => Box::new(LinearSource::from_env(
            endpoint.clone(),
            api_key_env,
            team.clone(),
            *limit,
        )),
        SourceConfig::Plan { path } => Box::new(PlanSource::new(paths::resolve(root, path))),
        SourceConfig::File { path } => Box::new(FileSource::new(paths::resolve(root, path))),
    }
}

fn fetch_batch(source: &dyn TaskSource) -> Result<SourceBatch> {
    let name = source.name();
    let tasks = source.fetch()?;
    tracing::debug!(source = %name, count = tasks.len(), "fetched tasks");
    Ok(SourceBatch {
        tasks: dedupe_ids(tasks, &name),
        source: name,
    })
}

/// Fetch every source. Primary failure aborts; secondary failures degrade.
pub fn aggregate(primary: &dyn TaskSource, secondaries: &[Box<dyn TaskSource>]) -> Result<Aggregation> {
    let primary_batch = fetch_batch(primary).map_err(|e| match e {
        TriageError::SourceFetch { .. } => e,
        other => TriageError::source_fetch(primary.name(), other.to_string()),
    })?;

    let mut aggregation = Aggregation {
        batches: vec![primary_batch],
        unavailable: Vec::new(),
    };

    for source in secondaries {
        match fetch_batch(source.as_ref()) {
            Ok(batch) => aggregation.batches.push(batch),
            Err(e) => {
                tracing::warn!(
                    source = %source.name(),
                    "source unavailable, continuing with remaining sources: {e}"
                );
                aggregation.unavailable.push(SourceWarning {
                    source: source.name(),
                    message: format!("source unavailable, continuing with remaining sources: {e}"),
                });
            }
        }
    }

    Ok(aggregation)
}

/// Build and fetch all configured sources.
pub fn aggregate_configured(cfg: &SourcesConfig, root: &Path) -> Result<Aggregation> {
    let primary = source_from_config(&cfg.primary, root);
    let secondaries: Vec<Box<dyn TaskSource>> = cfg
        .secondary
        .iter()
        .map(|s| source_from_config(s, root))
        .collect();
    aggregate(primary.as_ref(), &secondaries)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    struct Fixed {
        name: &'static str,
        tasks: Vec<Task>,
    }

    impl TaskSource for Fixed {
        fn tracker(&self) -> Tracker {
            Tracker::File
        }
        fn name(&self) -> String {
            self.name.to_string()
        }
        fn fetch(&self) -> Result<Vec<Task>> {
            Ok(self.tasks.clone())
        }
    }

    struct Down(&'static str);

    impl TaskSource for Down {
        fn tracker(&self) -> Tracker {
            Tracker::Linear
        }
        fn name(&self) -> String {
            self.0.to_string()
        }
        fn fetch(&self) -> Result<Vec<Task>> {
            Err(TriageError::ToolUnavailable("network".to_string()))
        }
    }

    fn t(id: &str) -> Task {
        Task::new(
            Tracker::File,
            id,
            format!("task {id}"),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn secondary_failure_degrades() {
        let primary = Fixed {
            name: "primary",
            tasks: vec![t("1"), t("2")],
        };
        let secondaries: Vec<Box<dyn TaskSource>> = vec![
            Box::new(Down("linear")),
            Box::new(Fixed {
                name: "plan",
                tasks: vec![t("p1")],
            }),
        ];
        let agg = aggregate(&primary, &secondaries).unwrap();
        assert_eq!(agg.batches.len(), 2);
        assert_eq!(agg.task_count(), 3);
        assert_eq!(agg.unavailable.len(), 1);
        assert_eq!(agg.unavailable[0].source, "linear");
        assert!(agg.unavailable[0].message.contains("continuing with remaining sources"));
    }

    #[test]
    fn primary_failure_aborts() {
        let err = aggregate(&Down("github"), &[]).unwrap_err();
        match err {
            TriageError::SourceFetch { source_name, reason } => {
                assert_eq!(source_name, "github");
                assert!(reason.contains("network"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn duplicate_ids_within_source_dropped() {
        let primary = Fixed {
            name: "primary",
            tasks: vec![t("1"), t("1")],
        };
        let agg = aggregate(&primary, &[]).unwrap();
        assert_eq!(agg.task_count(), 1);
    }
}
