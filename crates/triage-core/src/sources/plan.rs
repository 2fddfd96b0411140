use super::TaskSource;
use crate::error::{Result, TriageError};
use crate::task::Task;
use crate::types::Tracker;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

/// A markdown planning document. Each unchecked checklist item is a task:
///
/// ```markdown
/// ## Theming
/// - [ ] Dark mode toggle {effort/small, priority/high}
/// - [x] Finished items are skipped
/// ```
pub struct PlanSource {
    path: PathBuf,
}

impl PlanSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn label(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

impl TaskSource for PlanSource {
    fn tracker(&self) -> Tracker {
        Tracker::Plan
    }

    fn name(&self) -> String {
        format!("plan ({})", self.label())
    }

    fn fetch(&self) -> Result<Vec<Task>> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            TriageError::source_fetch(self.name(), format!("{}: {e}", self.path.display()))
        })?;
        let modified = std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        Ok(parse_plan(&content, &self.label(), modified))
    }
}

fn item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*[-*+]\s+\[(?P<mark>[ xX])\]\s+(?P<text>.+?)\s*$").expect("valid regex")
    })
}

fn labels_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(?P<labels>[^{}]*)\}\s*$").expect("valid regex"))
}

/// Parse open checklist items. Ids are `<file>:<line>` (1-based).
pub fn parse_plan(content: &str, file_label: &str, created_at: DateTime<Utc>) -> Vec<Task> {
    let mut heading: Option<String> = None;
    let mut tasks = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            let text = trimmed.trim_start_matches('#').trim();
            heading = (!text.is_empty()).then(|| text.to_string());
            continue;
        }

        let Some(caps) = item_re().captures(line) else {
            continue;
        };
        if !caps["mark"].trim().is_empty() {
            continue;
        }

        let text = &caps["text"];
        let (title, labels) = match labels_re().captures(text) {
            Some(lc) => {
                let start = lc.get(0).map(|m| m.start()).unwrap_or(text.len());
                let labels: Vec<String> = lc["labels"]
                    .split(',')
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect();
                (text[..start].trim().to_string(), labels)
            }
            None => (text.trim().to_string(), Vec::new()),
        };
        if title.is_empty() {
            continue;
        }

        let mut task = Task::new(Tracker::Plan, format!("{file_label}:{}", idx + 1), title, created_at)
            .with_labels(labels);
        if let Some(h) = &heading {
            task.body = format!("Section: {h}");
        }
        tasks.push(task);
    }

    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const PLAN: &str = "# Roadmap\n\
\n\
## Theming\n\
- [ ] Dark mode toggle {effort/small, priority/high}\n\
- [x] Light theme\n\
\n\
## Data\n\
* [ ] Export CSV\n\
  - [ ] Nested {bug}\n\
- [ ] {only-labels}\n\
- not a checklist item\n";

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn parses_open_items_with_labels_and_sections() {
        let tasks = parse_plan(PLAN, "ROADMAP.md", at());
        let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Dark mode toggle", "Export CSV", "Nested"]);

        let first = &tasks[0];
        assert_eq!(first.id, "ROADMAP.md:4");
        assert_eq!(first.tracker, Tracker::Plan);
        assert!(first.has_label("effort/small"));
        assert!(first.has_label("priority/high"));
        assert_eq!(first.body, "Section: Theming");

        assert_eq!(tasks[1].body, "Section: Data");
        assert!(tasks[2].has_label("bug"));
        assert_eq!(tasks[2].created_at, at());
    }

    #[test]
    fn fetch_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("PLAN.md");
        std::fs::write(&path, "- [ ] Write onboarding guide\n").unwrap();
        let tasks = PlanSource::new(&path).fetch().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "PLAN.md:1");
    }

    #[test]
    fn missing_file_is_source_fetch_error() {
        let dir = TempDir::new().unwrap();
        let err = PlanSource::new(dir.path().join("nope.md")).fetch().unwrap_err();
        assert!(matches!(err, TriageError::SourceFetch { .. }));
    }
}
