use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::models::Project;

/// The set of known projects, keyed by name and mirrored to a JSON file.
#[derive(Debug)]
pub struct Registry {
    path: PathBuf,
    projects: BTreeMap<String, Project>,
}

impl Registry {
    /// Load the registry file. A missing file is an empty registry.
    pub fn load(path: &Path) -> Result<Self> {
        let projects = if path.exists() {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            projects,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Project> {
        self.projects.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.projects.contains_key(name)
    }

    /// Projects in name order.
    pub fn list(&self) -> impl Iterator<Item = (&String, &Project)> {
        self.projects.iter()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Insert or replace a project. Returns the previous entry.
    pub fn upsert(&mut self, name: &str, project: Project) -> Option<Project> {
        self.projects.insert(name.to_string(), project)
    }

    pub fn remove(&mut self, name: &str) -> Option<Project> {
        self.projects.remove(name)
    }

    /// Write the registry to disk (atomic write via temp file + rename).
    pub fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(&self.projects)
            .context("Failed to serialize project registry")?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, data)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RepoMetadata;
    use chrono::Utc;

    fn project(url: &str, chunks: usize) -> Project {
        Project {
            url: url.to_string(),
            added: Utc::now(),
            last_updated: Utc::now(),
            last_commit: None,
            chunks,
            files: 1,
            metadata: RepoMetadata::default(),
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::load(&dir.path().join("projects.json")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("projects.json");

        let mut registry = Registry::load(&path).unwrap();
        registry.upsert("demo", project("https://github.com/acme/demo", 4));
        registry.upsert("another", project("https://github.com/acme/another", 2));
        registry.persist().unwrap();

        let reloaded = Registry::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("demo").unwrap().chunks, 4);
        let names: Vec<&String> = reloaded.list().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["another", "demo"]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_upsert_replaces_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::load(&dir.path().join("projects.json")).unwrap();
        assert!(registry.upsert("demo", project("a", 1)).is_none());
        let previous = registry.upsert("demo", project("b", 2)).unwrap();
        assert_eq!(previous.url, "a");
        assert_eq!(registry.get("demo").unwrap().url, "b");
        assert!(registry.remove("demo").is_some());
        assert!(!registry.contains("demo"));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Registry::load(&path).is_err());
    }
}
