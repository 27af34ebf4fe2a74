//! Code chunking: syntax-aware splitting for languages with a tree-sitter
//! grammar, separator-based recursive splitting for the other registered
//! languages, and a plain-text fallback.
//!
//! Every strategy first tiles the document into contiguous pieces no larger
//! than the chunk size, then [`recursive::merge`] packs the pieces into
//! overlapping windows. Chunks therefore never exceed the configured size.

pub mod ast;
pub mod recursive;
mod separators;

use thiserror::Error;

use crate::config::ChunkingConfig;
use crate::loader::Document;

pub use separators::SeparatorSet;

/// Output of the chunking process.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkOutput {
    pub content: String,
    /// Byte offset of `content` in the original text.
    pub offset: usize,
    /// 1-based start line in the original file.
    pub start_line: usize,
    /// 1-based end line in the original file.
    pub end_line: usize,
}

/// A chunk of a loaded document, ready to be embedded.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub source: String,
    pub language: String,
    /// Position of this chunk within its document.
    pub ordinal: usize,
    pub offset: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub text: String,
}

/// Languages with tree-sitter grammar support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxLanguage {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Tsx,
}

impl SyntaxLanguage {
    pub fn tree_sitter_language(&self) -> tree_sitter::Language {
        match self {
            SyntaxLanguage::Rust => tree_sitter_rust::LANGUAGE.into(),
            SyntaxLanguage::Python => tree_sitter_python::LANGUAGE.into(),
            SyntaxLanguage::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            SyntaxLanguage::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            SyntaxLanguage::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

/// How a document is split into pieces before merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// Split at syntax-tree node boundaries.
    Syntax(SyntaxLanguage),
    /// Split recursively at language-specific separators.
    Separators(SeparatorSet),
    /// Split recursively at paragraph, line and word boundaries.
    Plain,
}

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("file of {0} bytes is too large for syntax parsing")]
    TooLarge(usize),
    #[error("parser error: {0}")]
    Parser(String),
    #[error("syntax error rate {:.0}% exceeds threshold", .0 * 100.0)]
    ErrorRate(f64),
}

/// A contiguous byte range of the document being split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Splits documents into overlapping windows of at most `chunk_size` characters.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split `text` with the given strategy. Only syntax splitting can fail.
    pub fn split(&self, text: &str, strategy: ChunkStrategy) -> Result<Vec<ChunkOutput>, SplitError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let spans = match strategy {
            ChunkStrategy::Syntax(language) => ast::syntax_spans(text, language, self.chunk_size)?,
            ChunkStrategy::Separators(set) => self.tile(text, set),
            ChunkStrategy::Plain => self.tile(text, SeparatorSet::Plain),
        };

        Ok(recursive::merge(text, &spans, self.chunk_size, self.chunk_overlap))
    }

    /// Split with the plain-text strategy, which cannot fail.
    pub fn split_plain(&self, text: &str) -> Vec<ChunkOutput> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let spans = self.tile(text, SeparatorSet::Plain);
        recursive::merge(text, &spans, self.chunk_size, self.chunk_overlap)
    }

    /// Chunk one document, falling back to plain splitting if its
    /// language-aware strategy fails.
    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        let outputs = match self.split(&doc.text, doc.strategy) {
            Ok(outputs) => outputs,
            Err(e) => {
                tracing::warn!("{}: {e}, falling back to plain splitting", doc.source);
                self.split_plain(&doc.text)
            }
        };

        outputs
            .into_iter()
            .enumerate()
            .map(|(i, c)| Chunk {
                source: doc.source.clone(),
                language: doc.language.clone(),
                ordinal: i,
                offset: c.offset,
                start_line: c.start_line,
                end_line: c.end_line,
                text: c.content,
            })
            .collect()
    }

    /// Chunk every document independently, preserving document order.
    pub fn chunk_documents(&self, docs: &[Document]) -> Vec<Chunk> {
        docs.iter().flat_map(|d| self.chunk_document(d)).collect()
    }

    fn tile(&self, text: &str, set: SeparatorSet) -> Vec<Span> {
        let mut spans = Vec::new();
        recursive::tile(text, 0, text.len(), set.separators(), self.chunk_size, &mut spans);
        spans
    }
}
