use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use std::path::Path;
use walkdir::WalkDir;

use crate::models::CommitInfo;

/// Local vs. remote HEAD of a clone after fetching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStatus {
    pub local: String,
    pub remote: String,
}

impl RemoteStatus {
    pub fn has_updates(&self) -> bool {
        self.local != self.remote
    }
}

/// Clone a git repository into `target`, replacing anything already there.
pub fn clone_repo(url: &str, target: &Path, token: Option<&str>) -> Result<()> {
    tracing::info!("Cloning {} into {}", url, target.display());

    remove_dir_force(target)?;
    std::fs::create_dir_all(target)
        .with_context(|| format!("Failed to create {}", target.display()))?;

    let mut builder = git2::build::RepoBuilder::new();
    builder.fetch_options(fetch_options(token));
    builder
        .clone(url, target)
        .with_context(|| format!("Failed to clone {url}"))?;

    tracing::info!("Clone complete: {}", target.display());
    Ok(())
}

/// Fetch `origin` and hard-reset the checked-out branch to its remote-tracking
/// ref. Returns the new HEAD sha.
pub fn pull_repo(repo_dir: &Path, token: Option<&str>) -> Result<String> {
    let repo = open(repo_dir)?;
    fetch_origin(&repo, token)?;

    let branch = current_branch(&repo)?;
    let target = remote_head(&repo, &branch)?;
    repo.reset(target.as_object(), git2::ResetType::Hard, None)
        .with_context(|| format!("Failed to fast-forward {branch}"))?;

    let sha = target.id().to_string();
    tracing::info!("Pulled {} to {}", repo_dir.display(), short_sha(&sha));
    Ok(sha)
}

/// Fetch `origin` and compare local HEAD with the remote-tracking ref of the
/// checked-out branch. The working tree is left untouched.
pub fn check_for_updates(repo_dir: &Path, token: Option<&str>) -> Result<RemoteStatus> {
    let repo = open(repo_dir)?;
    fetch_origin(&repo, token)?;

    let branch = current_branch(&repo)?;
    let local = repo
        .head()
        .and_then(|h| h.peel_to_commit())
        .context("Failed to resolve local HEAD")?
        .id()
        .to_string();
    let remote = remote_head(&repo, &branch)?.id().to_string();

    Ok(RemoteStatus { local, remote })
}

/// Describe the HEAD commit of a local clone.
pub fn last_commit(repo_dir: &Path) -> Result<CommitInfo> {
    let repo = open(repo_dir)?;
    let commit = repo
        .head()
        .and_then(|h| h.peel_to_commit())
        .context("Failed to resolve HEAD commit")?;

    let time = commit.time();
    let date = FixedOffset::east_opt(time.offset_minutes() * 60)
        .and_then(|offset| {
            DateTime::from_timestamp(time.seconds(), 0).map(|utc| utc.with_timezone(&offset))
        })
        .map(|d| d.to_rfc3339())
        .unwrap_or_default();

    let author = commit.author();
    Ok(CommitInfo {
        sha: short_sha(&commit.id().to_string()).to_string(),
        message: commit.message().unwrap_or_default().trim().to_string(),
        author: author.name().unwrap_or("unknown").to_string(),
        date,
        url: None,
    })
}

/// Remove a directory tree, clearing read-only permissions if the first
/// attempt is denied. A missing directory is not an error.
pub fn remove_dir_force(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            tracing::debug!("Clearing read-only files under {}", path.display());
            clear_readonly(path);
            std::fs::remove_dir_all(path)
                .with_context(|| format!("Failed to remove {}", path.display()))
        }
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

#[allow(clippy::permissions_set_readonly_false)]
fn clear_readonly(path: &Path) {
    for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
        if let Ok(meta) = entry.metadata() {
            let mut perms = meta.permissions();
            if perms.readonly() {
                perms.set_readonly(false);
                let _ = std::fs::set_permissions(entry.path(), perms);
            }
        }
    }
}

fn open(repo_dir: &Path) -> Result<git2::Repository> {
    git2::Repository::open(repo_dir)
        .with_context(|| format!("No git repository at {}", repo_dir.display()))
}

fn fetch_options(token: Option<&str>) -> git2::FetchOptions<'static> {
    let mut callbacks = git2::RemoteCallbacks::new();
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        let token = token.to_string();
        callbacks.credentials(move |_url, _username, _allowed| {
            git2::Cred::userpass_plaintext("x-access-token", &token)
        });
    }
    let mut opts = git2::FetchOptions::new();
    opts.remote_callbacks(callbacks);
    opts
}

fn fetch_origin(repo: &git2::Repository, token: Option<&str>) -> Result<()> {
    let mut remote = repo
        .find_remote("origin")
        .context("Repository has no 'origin' remote")?;
    // Empty refspec list: use the configured refs/heads/* -> refs/remotes/origin/*
    remote
        .fetch(&[] as &[&str], Some(&mut fetch_options(token)), None)
        .context("Failed to fetch origin")?;
    Ok(())
}

fn current_branch(repo: &git2::Repository) -> Result<String> {
    let head = repo.head().context("Failed to read HEAD")?;
    if !head.is_branch() {
        anyhow::bail!("HEAD is detached; cannot track a remote branch");
    }
    head.shorthand()
        .map(str::to_string)
        .context("Branch name is not valid UTF-8")
}

fn remote_head<'r>(repo: &'r git2::Repository, branch: &str) -> Result<git2::Commit<'r>> {
    repo.find_reference(&format!("refs/remotes/origin/{branch}"))
        .and_then(|r| r.peel_to_commit())
        .with_context(|| format!("Remote branch origin/{branch} not found"))
}

fn short_sha(sha: &str) -> &str {
    &sha[..sha.len().min(7)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit_file(repo: &git2::Repository, name: &str, content: &str, message: &str) {
        let workdir = repo.workdir().unwrap().to_path_buf();
        std::fs::write(workdir.join(name), content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("Ada Lovelace", "ada@example.com").unwrap();
        let parents: Vec<git2::Commit> = repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok())
            .into_iter()
            .collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap();
    }

    #[test]
    fn test_clone_replaces_existing_directory() {
        let origin_dir = tempfile::tempdir().unwrap();
        let origin = git2::Repository::init(origin_dir.path()).unwrap();
        commit_file(&origin, "main.py", "print('hi')\n", "Initial commit");

        let work = tempfile::tempdir().unwrap();
        let target = work.path().join("demo");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("stale.txt"), "old").unwrap();

        clone_repo(origin_dir.path().to_str().unwrap(), &target, None).unwrap();
        assert!(target.join("main.py").exists());
        assert!(!target.join("stale.txt").exists());
    }

    #[test]
    fn test_clone_invalid_url_fails() {
        let work = tempfile::tempdir().unwrap();
        let missing = work.path().join("does-not-exist");
        let result = clone_repo(missing.to_str().unwrap(), &work.path().join("x"), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_check_and_pull_detect_new_commits() {
        let origin_dir = tempfile::tempdir().unwrap();
        let origin = git2::Repository::init(origin_dir.path()).unwrap();
        commit_file(&origin, "a.txt", "one\n", "first");

        let work = tempfile::tempdir().unwrap();
        let target = work.path().join("clone");
        clone_repo(origin_dir.path().to_str().unwrap(), &target, None).unwrap();

        let status = check_for_updates(&target, None).unwrap();
        assert!(!status.has_updates());

        commit_file(&origin, "b.txt", "two\n", "second");
        let status = check_for_updates(&target, None).unwrap();
        assert!(status.has_updates());
        // Checking must not move the working tree
        assert!(!target.join("b.txt").exists());

        let new_head = pull_repo(&target, None).unwrap();
        assert_eq!(new_head, status.remote);
        assert!(target.join("b.txt").exists());
        assert!(!check_for_updates(&target, None).unwrap().has_updates());
    }

    #[test]
    fn test_last_commit_reports_short_sha_and_author() {
        let dir = tempfile::tempdir().unwrap();
        let repo = git2::Repository::init(dir.path()).unwrap();
        commit_file(&repo, "README.md", "# Demo\n", "Add readme\n\nLonger body");

        let info = last_commit(dir.path()).unwrap();
        assert_eq!(info.sha.len(), 7);
        assert_eq!(info.author, "Ada Lovelace");
        assert!(info.message.starts_with("Add readme"));
        assert!(DateTime::parse_from_rfc3339(&info.date).is_ok());
    }

    #[test]
    fn test_remove_dir_force_handles_readonly_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("ro");
        std::fs::create_dir_all(target.join("objects")).unwrap();
        let file = target.join("objects").join("pack");
        std::fs::write(&file, "x").unwrap();
        let mut perms = std::fs::metadata(&file).unwrap().permissions();
        perms.set_readonly(true);
        std::fs::set_permissions(&file, perms).unwrap();

        remove_dir_force(&target).unwrap();
        assert!(!target.exists());
        remove_dir_force(&target).unwrap();
    }
}
