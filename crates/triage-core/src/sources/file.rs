use super::TaskSource;
use crate::error::{Result, TriageError};
use crate::task::Task;
use crate::types::Tracker;
use std::path::PathBuf;

/// Task records exported to a JSON or YAML file, e.g. a tracker snapshot.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TaskSource for FileSource {
    fn tracker(&self) -> Tracker {
        Tracker::File
    }

    fn name(&self) -> String {
        format!("file ({})", self.path.display())
    }

    fn fetch(&self) -> Result<Vec<Task>> {
        let data = std::fs::read_to_string(&self.path)
            .map_err(|e| TriageError::source_fetch(self.name(), e.to_string()))?;
        let ext = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let parsed: std::result::Result<Vec<Task>, String> = match ext.as_str() {
            "json" => serde_json::from_str(&data).map_err(|e| e.to_string()),
            "yaml" | "yml" => serde_yaml::from_str(&data).map_err(|e| e.to_string()),
            other => {
                return Err(TriageError::Configuration(format!(
                    "unsupported task file extension '{other}' for {}",
                    self.path.display()
                )))
            }
        };
        parsed.map_err(|e| TriageError::source_fetch(self.name(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reads_yaml_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.yaml");
        std::fs::write(
            &path,
            r#"
- id: "101"
  tracker: github
  title: Dark mode toggle
  labels: [effort/medium]
  created_at: 2024-01-01T00:00:00Z
- id: T2
  tracker: file
  title: Export CSV
  body: "blocks #101"
  created_at: 2024-02-01T00:00:00Z
"#,
        )
        .unwrap();
        let tasks = FileSource::new(&path).fetch().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].tracker, Tracker::Github);
        assert!(tasks[0].has_label("effort/medium"));
        assert_eq!(tasks[1].body, "blocks #101");
    }

    #[test]
    fn reads_json_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(
            &path,
            r#"[{"id":"1","tracker":"file","title":"Audit logging","created_at":"2024-01-01T00:00:00Z"}]"#,
        )
        .unwrap();
        let tasks = FileSource::new(&path).fetch().unwrap();
        assert_eq!(tasks[0].title, "Audit logging");
    }

    #[test]
    fn malformed_file_is_source_fetch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, "{").unwrap();
        assert!(matches!(
            FileSource::new(&path).fetch(),
            Err(TriageError::SourceFetch { .. })
        ));
    }

    #[test]
    fn unknown_extension_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.csv");
        std::fs::write(&path, "id,title").unwrap();
        assert!(matches!(
            FileSource::new(&path).fetch(),
            Err(TriageError::Configuration(_))
        ));
    }
}
