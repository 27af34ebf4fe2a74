//! Repository metadata from the GitHub REST API.
//!
//! Lookups are best effort: any failure is folded into
//! [`RepoMetadata::failed`] so that ingestion never depends on the API.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::{CommitInfo, RepoMetadata};

const MAX_BRANCHES: usize = 10;

/// Fetch stars, forks, branches and the latest commit for a GitHub URL.
pub async fn fetch_repo_metadata(
    client: &reqwest::Client,
    api_url: &str,
    repo_url: &str,
    token: Option<&str>,
) -> RepoMetadata {
    let Some((owner, repo)) = parse_github_url(repo_url) else {
        return RepoMetadata::failed(format!("{repo_url} is not a GitHub repository URL"));
    };

    match fetch_inner(client, api_url, &owner, &repo, token).await {
        Ok(meta) => meta,
        Err(e) => {
            tracing::warn!("Metadata lookup failed for {owner}/{repo}: {e:#}");
            RepoMetadata::failed(format!("{e:#}"))
        }
    }
}

/// Extract `(owner, repo)` from https, ssh or scp-style GitHub URLs.
pub fn parse_github_url(url: &str) -> Option<(String, String)> {
    let url = url.trim().trim_end_matches('/');
    let path = url
        .strip_prefix("https://github.com/")
        .or_else(|| url.strip_prefix("http://github.com/"))
        .or_else(|| url.strip_prefix("ssh://git@github.com/"))
        .or_else(|| url.strip_prefix("git@github.com:"))?;

    let mut parts = path.split('/');
    let owner = parts.next().filter(|s| !s.is_empty())?;
    let repo = parts.next().filter(|s| !s.is_empty())?;
    let repo = repo.trim_end_matches(".git");
    if repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

#[derive(Deserialize)]
struct GhRepo {
    name: String,
    description: Option<String>,
    stargazers_count: u64,
    forks_count: u64,
    language: Option<String>,
    pushed_at: Option<String>,
    open_issues_count: u64,
}

#[derive(Deserialize)]
struct GhBranch {
    name: String,
}

#[derive(Deserialize)]
struct GhCommit {
    sha: String,
    html_url: Option<String>,
    commit: GhCommitDetail,
}

#[derive(Deserialize)]
struct GhCommitDetail {
    message: String,
    author: Option<GhCommitAuthor>,
}

#[derive(Deserialize)]
struct GhCommitAuthor {
    name: Option<String>,
    date: Option<String>,
}

async fn fetch_inner(
    client: &reqwest::Client,
    api_url: &str,
    owner: &str,
    repo: &str,
    token: Option<&str>,
) -> Result<RepoMetadata> {
    let base = format!("{}/repos/{owner}/{repo}", api_url.trim_end_matches('/'));

    let info: GhRepo = get_json(client, &base, token).await?;
    let branches: Vec<GhBranch> =
        get_json(client, &format!("{base}/branches?per_page={MAX_BRANCHES}"), token).await?;
    let commits: Vec<GhCommit> = get_json(client, &format!("{base}/commits?per_page=1"), token).await?;

    let latest_commit = commits.into_iter().next().map(|c| {
        let author = c.commit.author.unwrap_or(GhCommitAuthor {
            name: None,
            date: None,
        });
        CommitInfo {
            sha: c.sha.chars().take(7).collect(),
            message: c.commit.message.trim().to_string(),
            author: author.name.unwrap_or_else(|| "unknown".to_string()),
            date: author.date.unwrap_or_default(),
            url: c.html_url,
        }
    });

    Ok(RepoMetadata {
        name: Some(info.name),
        description: info.description,
        stars: Some(info.stargazers_count),
        forks: Some(info.forks_count),
        language: info.language,
        pushed_at: info.pushed_at,
        open_issues: Some(info.open_issues_count),
        branches: branches
            .into_iter()
            .take(MAX_BRANCHES)
            .map(|b| b.name)
            .collect(),
        latest_commit,
        error: None,
    })
}

async fn get_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    token: Option<&str>,
) -> Result<T> {
    let mut req = client
        .get(url)
        .header("User-Agent", "repo-chat")
        .header("Accept", "application/vnd.github+json");
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        req = req.header("Authorization", format!("Bearer {token}"));
    }

    let resp = req
        .send()
        .await
        .with_context(|| format!("Failed to call {url}"))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("GitHub API returned {status}: {body}");
    }

    resp.json()
        .await
        .with_context(|| format!("Failed to parse response from {url}"))
}
