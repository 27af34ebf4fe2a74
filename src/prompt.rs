//! Answer prompt rendering.
//!
//! The template is a versioned text file with `{context}`, `{question}` and
//! `{commit_context}` slots. The built-in version is compiled in; a file
//! configured through `REPO_CHAT_PROMPT_TEMPLATE` replaces it.

use anyhow::{Context, Result};
use std::path::Path;

use crate::models::CommitInfo;
use crate::search::VectorHit;

const BUILTIN_TEMPLATE: &str = include_str!("../templates/answer_prompt.v1.txt");

const SLOTS: [&str; 3] = ["context", "question", "commit_context"];

/// Chat-markup tokens stripped from anything interpolated into the prompt.
const CONTROL_TOKENS: [&str; 6] = [
    "<|im_start|>",
    "<|im_end|>",
    "<|endoftext|>",
    "<|system|>",
    "[INST]",
    "[/INST]",
];

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            text: BUILTIN_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Load the override at `path`, or the built-in template when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt template {}", path.display()))?;
        Self::from_text(text)
    }

    pub fn from_text(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        for required in ["{context}", "{question}"] {
            if !text.contains(required) {
                anyhow::bail!("Prompt template is missing the {required} slot");
            }
        }
        Ok(Self { text })
    }

    /// Fill the slots in a single pass, so slot-like text inside the values
    /// is never expanded.
    pub fn render(&self, context: &str, question: &str, commit_context: &str) -> String {
        let mut out = String::with_capacity(self.text.len() + context.len() + question.len());
        let mut rest = self.text.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let slot = SLOTS.iter().find(|name| {
                after.starts_with(*name) && after[name.len()..].starts_with('}')
            });
            match slot {
                Some(&name) => {
                    out.push_str(match name {
                        "context" => context,
                        "question" => question,
                        _ => commit_context,
                    });
                    rest = &after[name.len() + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Join retrieved chunk texts with blank lines.
pub fn format_context(hits: &[VectorHit]) -> String {
    hits.iter()
        .map(|h| sanitize_for_prompt(&h.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Commit block for the `{commit_context}` slot; empty when nothing is known.
pub fn commit_context(commit: Option<&CommitInfo>, repo_url: &str) -> String {
    let Some(commit) = commit else {
        return String::new();
    };
    let mut block = format!(
        "\nRepository Commit Information:\n\
         - Latest Commit SHA: {}\n\
         - Commit Message: {}\n\
         - Author: {}\n\
         - Date: {}\n\
         - Repository: {repo_url}\n",
        commit.sha,
        sanitize_for_prompt(&commit.message),
        commit.author,
        commit.date,
    );
    if let Some(url) = &commit.url {
        block.push_str(&format!("- Commit URL: {url}\n"));
    }
    block
}

pub fn sanitize_for_prompt(text: &str) -> String {
    let mut out = text.to_string();
    for token in CONTROL_TOKENS {
        if out.contains(token) {
            out = out.replace(token, "");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(text: &str) -> VectorHit {
        VectorHit {
            source: "a.py".into(),
            language: "python".into(),
            start_line: 1,
            end_line: 1,
            text: text.into(),
            score: 1.0,
        }
    }

    #[test]
    fn test_builtin_template_has_all_slots() {
        let rendered = PromptTemplate::default().render("CTX", "QUESTION?", "COMMIT");
        assert!(rendered.contains("CTX"));
        assert!(rendered.contains("User Question: QUESTION?"));
        assert!(rendered.contains("COMMIT"));
        assert!(!rendered.contains("{context}"));
    }

    #[test]
    fn test_render_is_single_pass() {
        let template = PromptTemplate::from_text("Q: {question}\nC: {context}\n{other}").unwrap();
        let rendered = template.render("ctx", "what is {context}?", "");
        assert_eq!(rendered, "Q: what is {context}?\nC: ctx\n{other}");
    }

    #[test]
    fn test_template_requires_slots() {
        assert!(PromptTemplate::from_text("no slots here").is_err());
        assert!(PromptTemplate::from_text("{context} only").is_err());
    }

    #[test]
    fn test_load_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "Context: {context}\nQuestion: {question}").unwrap();
        let template = PromptTemplate::load(Some(&path)).unwrap();
        assert_eq!(template.render("c", "q", ""), "Context: c\nQuestion: q");
        assert!(PromptTemplate::load(Some(&dir.path().join("missing.txt"))).is_err());
    }

    #[test]
    fn test_context_joins_with_blank_lines() {
        assert_eq!(format_context(&[hit("one"), hit("two")]), "one\n\ntwo");
    }

    #[test]
    fn test_commit_context_block() {
        let commit = CommitInfo {
            sha: "abc1234".into(),
            message: "Fix parser".into(),
            author: "Grace".into(),
            date: "2024-05-01T09:00:00Z".into(),
            url: None,
        };
        let block = commit_context(Some(&commit), "https://github.com/acme/demo");
        assert!(block.contains("Latest Commit SHA: abc1234"));
        assert!(block.contains("Author: Grace"));
        assert!(block.contains("Repository: https://github.com/acme/demo"));
        assert_eq!(commit_context(None, "x"), "");
    }

    #[test]
    fn test_sanitize_strips_control_tokens() {
        assert_eq!(
            sanitize_for_prompt("<|im_start|>system\nhi<|im_end|>"),
            "system\nhi"
        );
        assert_eq!(sanitize_for_prompt("plain"), "plain");
    }
}
