use super::TaskSource;
use crate::error::{Result, TriageError};
use crate::task::Task;
use crate::types::Tracker;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const ISSUES_QUERY: &str = r#"query Issues($first: Int!, $filter: IssueFilter) {
  issues(first: $first, filter: $filter) {
    nodes {
      identifier
      title
      description
      url
      createdAt
      priority
      labels { nodes { name } }
      assignee { displayName }
    }
  }
}"#;

/// Open Linear issues over the GraphQL API.
pub struct LinearSource {
    endpoint: String,
    api_key: Option<String>,
    api_key_env: String,
    team: Option<String>,
    limit: u32,
}

impl LinearSource {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, team: Option<String>, limit: u32) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: Some(api_key.into()),
            api_key_env: String::new(),
            team,
            limit,
        }
    }

    /// Read the API key from `api_key_env`. A missing key is reported when
    /// fetching, so an unconfigured secondary source only degrades.
    pub fn from_env(endpoint: String, api_key_env: &str, team: Option<String>, limit: u32) -> Self {
        Self {
            endpoint,
            api_key: std::env::var(api_key_env).ok().filter(|k| !k.trim().is_empty()),
            api_key_env: api_key_env.to_string(),
            team,
            limit,
        }
    }

    fn request_body(&self) -> serde_json::Value {
        let mut filter = json!({
            "state": { "type": { "nin": ["completed", "canceled"] } }
        });
        if let Some(team) = &self.team {
            filter["team"] = json!({ "key": { "eq": team } });
        }
        json!({
            "query": ISSUES_QUERY,
            "variables": { "first": self.limit, "filter": filter },
        })
    }
}

impl TaskSource for LinearSource {
    fn tracker(&self) -> Tracker {
        Tracker::Linear
    }

    fn name(&self) -> String {
        match &self.team {
            Some(team) => format!("linear ({team})"),
            None => "linear".to_string(),
        }
    }

    fn fetch(&self) -> Result<Vec<Task>> {
        let Some(api_key) = &self.api_key else {
            return Err(TriageError::Configuration(format!(
                "linear source needs an API key in ${}",
                self.api_key_env
            )));
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TriageError::source_fetch(self.name(), e.to_string()))?;
        let response = client
            .post(&self.endpoint)
            .header("Authorization", api_key)
            .json(&self.request_body())
            .send()
            .map_err(|e| TriageError::source_fetch(self.name(), e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| TriageError::source_fetch(self.name(), e.to_string()))?;
        if !status.is_success() {
            let hint: String = text.chars().take(300).collect();
            return Err(TriageError::source_fetch(
                self.name(),
                format!("HTTP {status}: {hint}"),
            ));
        }
        parse_response(&text).map_err(|msg| TriageError::source_fetch(self.name(), msg))
    }
}

// ---------------------------------------------------------------------------
// GraphQL response
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<Data>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Data {
    issues: Connection<LinearIssue>,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinearIssue {
    identifier: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
    created_at: DateTime<Utc>,
    /// Linear types this as a Float.
    #[serde(default)]
    priority: f64,
    #[serde(default)]
    labels: Option<Connection<LinearLabel>>,
    #[serde(default)]
    assignee: Option<LinearUser>,
}

#[derive(Debug, Deserialize)]
struct LinearLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinearUser {
    display_name: String,
}

/// Linear's numeric priority (1 urgent .. 4 low) as the label vocabulary the
/// scorer understands. 0 means "no priority".
fn priority_label(priority: u8) -> Option<&'static str> {
    match priority {
        1 => Some("priority/critical"),
        2 => Some("priority/high"),
        3 => Some("priority/medium"),
        _ => None,
    }
}

fn parse_response(text: &str) -> std::result::Result<Vec<Task>, String> {
    let envelope: Envelope =
        serde_json::from_str(text).map_err(|e| format!("bad response: {e}"))?;
    if !envelope.errors.is_empty() {
        let messages: Vec<String> = envelope.errors.into_iter().map(|e| e.message).collect();
        return Err(format!("graphql: {}", messages.join("; ")));
    }
    let Some(data) = envelope.data else {
        return Err("graphql: response has no data".to_string());
    };

    Ok(data
        .issues
        .nodes
        .into_iter()
        .map(|i| {
            let mut labels: Vec<String> = i
                .labels
                .map(|c| c.nodes.into_iter().map(|l| l.name).collect())
                .unwrap_or_default();
            if let Some(p) = priority_label(i.priority.round() as u8) {
                labels.push(p.to_string());
            }
            let mut task = Task::new(Tracker::Linear, i.identifier, i.title, i.created_at)
                .with_body(i.description.unwrap_or_default())
                .with_labels(labels)
                .with_assignees(i.assignee.map(|a| a.display_name));
            task.url = i.url;
            task
        })
        .collect())
}
