//! Repository file loading.
//!
//! Walks a clone, keeps files whose extension is registered in the
//! [`LanguageRegistry`] and reports what happened to every other file.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use walkdir::WalkDir;

use crate::chunking::{ChunkStrategy, SeparatorSet, SyntaxLanguage};

/// A file read from a repository, ready to be chunked.
#[derive(Debug, Clone)]
pub struct Document {
    /// Path relative to the repository root, with `/` separators.
    pub source: String,
    pub language: String,
    pub strategy: ChunkStrategy,
    pub text: String,
}

/// What the registry knows about one extension.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageSpec {
    pub language: String,
    pub strategy: ChunkStrategy,
}

/// Extension to language dispatch.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    by_extension: HashMap<String, LanguageSpec>,
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        use ChunkStrategy::{Plain, Separators, Syntax};

        let mut registry = Self::empty();
        let defaults: [(&[&str], &str, ChunkStrategy); 20] = [
            (&["py"], "python", Syntax(SyntaxLanguage::Python)),
            (&["js", "jsx"], "javascript", Syntax(SyntaxLanguage::JavaScript)),
            (&["ts"], "typescript", Syntax(SyntaxLanguage::TypeScript)),
            (&["tsx"], "tsx", Syntax(SyntaxLanguage::Tsx)),
            (&["rs"], "rust", Syntax(SyntaxLanguage::Rust)),
            (&["java"], "java", Separators(SeparatorSet::Java)),
            (&["c", "h"], "c", Separators(SeparatorSet::Cpp)),
            (&["cpp", "cc", "hpp"], "cpp", Separators(SeparatorSet::Cpp)),
            (&["cs"], "csharp", Separators(SeparatorSet::CSharp)),
            (&["go"], "go", Separators(SeparatorSet::Go)),
            (&["rb"], "ruby", Separators(SeparatorSet::Ruby)),
            (&["php"], "php", Separators(SeparatorSet::Php)),
            (&["kt", "kts"], "kotlin", Separators(SeparatorSet::Kotlin)),
            (&["swift"], "swift", Separators(SeparatorSet::Swift)),
            (&["scala"], "scala", Separators(SeparatorSet::Scala)),
            (&["html", "htm"], "html", Separators(SeparatorSet::Html)),
            (&["md", "markdown"], "markdown", Separators(SeparatorSet::Markdown)),
            (&["txt"], "text", Plain),
            (&["json", "xml"], "data", Plain),
            (&["yaml", "yml", "toml", "ini", "cfg", "conf"], "config", Plain),
        ];

        for (extensions, language, strategy) in defaults {
            for ext in extensions {
                registry.register(ext, language, strategy);
            }
        }
        registry
    }
}

impl LanguageRegistry {
    pub fn empty() -> Self {
        Self {
            by_extension: HashMap::new(),
        }
    }

    /// Register (or replace) the handling of an extension. Case-insensitive,
    /// a leading dot is ignored.
    pub fn register(&mut self, extension: &str, language: &str, strategy: ChunkStrategy) {
        let ext = extension.trim_start_matches('.').to_lowercase();
        self.by_extension.insert(
            ext,
            LanguageSpec {
                language: language.to_string(),
                strategy,
            },
        );
    }

    pub fn lookup(&self, path: &Path) -> Option<&LanguageSpec> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        self.by_extension.get(&ext)
    }

    pub fn len(&self) -> usize {
        self.by_extension.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_extension.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum FileOutcome {
    Loaded,
    Unsupported,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Per-file outcomes of one load.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub files: Vec<FileReport>,
}

/// Counts plus the first few failures, for logs and API responses.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub unsupported: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
}

impl LoadReport {
    const MAX_LISTED_FAILURES: usize = 10;

    fn record(&mut self, path: String, outcome: FileOutcome) {
        self.files.push(FileReport { path, outcome });
    }

    pub fn summary(&self) -> LoadSummary {
        let mut summary = LoadSummary::default();
        for file in &self.files {
            match &file.outcome {
                FileOutcome::Loaded => summary.loaded += 1,
                FileOutcome::Unsupported => summary.unsupported += 1,
                FileOutcome::Failed(reason) => {
                    summary.failed += 1;
                    if summary.failures.len() < Self::MAX_LISTED_FAILURES {
                        summary.failures.push(format!("{}: {reason}", file.path));
                    }
                }
            }
        }
        summary
    }
}

/// Load every registered file under `root`, sorted by relative path.
pub fn load_documents(
    root: &Path,
    registry: &LanguageRegistry,
    max_file_bytes: u64,
) -> (Vec<Document>, LoadReport) {
    let mut docs = Vec::new();
    let mut report = LoadReport::default();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        // The root itself may live under a dot-directory (e.g. temp dirs)
        .filter_entry(|e| e.depth() == 0 || !is_hidden_or_ignored(e))
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path
            .strip_prefix(root)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let Some(spec) = registry.lookup(path) else {
            report.record(relative, FileOutcome::Unsupported);
            continue;
        };

        match read_text(path, max_file_bytes) {
            Ok(text) => {
                docs.push(Document {
                    source: relative.clone(),
                    language: spec.language.clone(),
                    strategy: spec.strategy,
                    text,
                });
                report.record(relative, FileOutcome::Loaded);
            }
            Err(reason) => {
                tracing::debug!("Skipping {relative}: {reason}");
                report.record(relative, FileOutcome::Failed(reason));
            }
        }
    }

    docs.sort_by(|a, b| a.source.cmp(&b.source));
    (docs, report)
}

fn read_text(path: &Path, max_file_bytes: u64) -> Result<String, String> {
    let meta = std::fs::metadata(path).map_err(|e| e.to_string())?;
    if meta.len() > max_file_bytes {
        return Err(format!("too large ({} bytes)", meta.len()));
    }
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|_| "not valid UTF-8".to_string())
}

fn is_hidden_or_ignored(entry: &walkdir::DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') {
        return true;
    }
    entry.file_type().is_dir()
        && matches!(
            name.as_ref(),
            "node_modules" | "target" | "dist" | "build" | "__pycache__" | "vendor" | "venv"
        )
}
