use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked project: one named repository ingestion with its own clone and index.
///
/// The registry file stores these keyed by project name, so the name itself
/// is not serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub url: String,
    pub added: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub last_commit: Option<CommitInfo>,
    pub chunks: usize,
    pub files: usize,
    #[serde(default)]
    pub metadata: RepoMetadata,
}

/// A commit as recorded from the local clone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitInfo {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Snapshot of what the code-hosting API reports about a repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RepoMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forks: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_issues: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_commit: Option<CommitInfo>,
    /// Set when the lookup failed; the rest of the snapshot is then empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RepoMetadata {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// A single conversation turn (user or assistant)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Add-project request
#[derive(Debug, Clone, Deserialize)]
pub struct AddProjectRequest {
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// Token for update and update-check requests (JSON body or query string)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub token: Option<String>,
}

/// Chat request
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Body shared by the chat and ingestion endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextResponse {
    pub response: String,
}

/// A project together with its registry key
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub name: String,
    #[serde(flatten)]
    pub project: Project,
    pub active: bool,
}

/// Data behind the project information panel
#[derive(Debug, Clone, Serialize)]
pub struct ProjectPanel {
    pub name: String,
    pub url: String,
    pub files: usize,
    pub chunks: usize,
    pub language: Option<String>,
    pub stars: Option<u64>,
    pub open_issues: Option<u64>,
    pub last_updated: DateTime<Utc>,
    pub latest_commit: Option<CommitInfo>,
    pub branches: Vec<String>,
}

impl ProjectPanel {
    const MAX_BRANCHES: usize = 5;

    pub fn new(name: &str, project: &Project) -> Self {
        let meta = &project.metadata;
        Self {
            name: name.to_string(),
            url: project.url.clone(),
            files: project.files,
            chunks: project.chunks,
            language: meta.language.clone(),
            stars: meta.stars,
            open_issues: meta.open_issues,
            last_updated: project.last_updated,
            latest_commit: meta
                .latest_commit
                .clone()
                .or_else(|| project.last_commit.clone()),
            branches: meta.branches.iter().take(Self::MAX_BRANCHES).cloned().collect(),
        }
    }
}

/// Result of comparing a clone against its remote
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    UpToDate,
    UpdatesAvailable,
    Updated,
}

impl UpdateStatus {
    pub fn describe(&self) -> &'static str {
        match self {
            UpdateStatus::UpToDate => "up to date",
            UpdateStatus::UpdatesAvailable => "updates available",
            UpdateStatus::Updated => "updated",
        }
    }
}

/// Update-check / update response
#[derive(Debug, Clone, Serialize)]
pub struct UpdateResponse {
    pub status: UpdateStatus,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
}

/// Current chat session
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub active: Option<String>,
    pub history: Vec<ChatMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_project() -> Project {
        Project {
            url: "https://github.com/acme/demo".into(),
            added: Utc::now(),
            last_updated: Utc::now(),
            last_commit: Some(CommitInfo {
                sha: "abc1234".into(),
                message: "Initial commit".into(),
                author: "Ada".into(),
                date: "2024-01-01T00:00:00+00:00".into(),
                url: None,
            }),
            chunks: 12,
            files: 3,
            metadata: RepoMetadata::default(),
        }
    }

    #[test]
    fn test_project_serializes_registry_fields() {
        let json = serde_json::to_value(sample_project()).unwrap();
        for key in ["url", "added", "last_updated", "last_commit", "chunks", "files", "metadata"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["last_commit"]["sha"], "abc1234");
        assert!(json["last_commit"].get("url").is_none());
    }

    #[test]
    fn test_failed_metadata_only_carries_error() {
        let json = serde_json::to_value(RepoMetadata::failed("rate limited")).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "rate limited" }));
    }

    #[test]
    fn test_panel_limits_branches_and_falls_back_to_local_commit() {
        let mut project = sample_project();
        project.metadata.branches = (0..10).map(|i| format!("b{i}")).collect();
        let panel = ProjectPanel::new("demo", &project);
        assert_eq!(panel.branches.len(), 5);
        assert_eq!(panel.latest_commit.unwrap().sha, "abc1234");
    }

    #[test]
    fn test_update_status_snake_case() {
        let json = serde_json::to_value(UpdateStatus::UpToDate).unwrap();
        assert_eq!(json, "up_to_date");
    }
}
