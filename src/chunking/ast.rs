//! Syntax-aware tiling using tree-sitter.
//!
//! 1. Parse source into a syntax tree
//! 2. Walk top-level nodes, emitting each node (plus any preceding gap) as a piece
//! 3. If a node exceeds the chunk size, recurse into its children
//! 4. Leaves that are still too large go through the plain recursive splitter
//!
//! The caller falls back to plain splitting when this returns an error:
//! - File exceeds MAX_FILE_SIZE (500 KB)
//! - The parser produces no tree
//! - Parse produces >30% error nodes

use super::recursive;
use super::{SeparatorSet, Span, SplitError, SyntaxLanguage};

/// Files larger than this skip syntax parsing entirely.
const MAX_FILE_SIZE: usize = 500 * 1024; // 500 KB

/// If more than this fraction of syntax nodes are error nodes, give up.
const ERROR_THRESHOLD: f64 = 0.30;

/// Tile `content` into pieces aligned with syntax-node boundaries.
pub fn syntax_spans(
    content: &str,
    language: SyntaxLanguage,
    max_chars: usize,
) -> Result<Vec<Span>, SplitError> {
    if content.len() > MAX_FILE_SIZE {
        return Err(SplitError::TooLarge(content.len()));
    }

    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&language.tree_sitter_language())
        .map_err(|e| SplitError::Parser(e.to_string()))?;

    let tree = parser
        .parse(content, None)
        .ok_or_else(|| SplitError::Parser("parser produced no tree".to_string()))?;
    let root = tree.root_node();

    let (total, errors) = count_nodes(root);
    if total > 0 {
        let rate = errors as f64 / total as f64;
        if rate > ERROR_THRESHOLD {
            return Err(SplitError::ErrorRate(rate));
        }
    }

    let mut spans = Vec::new();
    let end = collect(root, content, 0, max_chars, &mut spans);
    if end < content.len() {
        split_piece(content, end, content.len(), max_chars, &mut spans);
    }
    Ok(spans)
}

/// Emit pieces for the children of `node`, starting at byte `cursor`.
/// Each piece runs from the end of the previous one to the end of a child,
/// so comments and whitespace between nodes stay attached to the next node.
/// Returns the byte offset reached.
fn collect(
    node: tree_sitter::Node,
    content: &str,
    mut cursor: usize,
    max_chars: usize,
    spans: &mut Vec<Span>,
) -> usize {
    let mut walker = node.walk();
    for child in node.children(&mut walker) {
        let end = ceil_char_boundary(content, child.end_byte());
        if end <= cursor {
            continue;
        }

        if content[cursor..end].chars().count() <= max_chars {
            spans.push(Span { start: cursor, end });
        } else if child.child_count() > 0 {
            cursor = collect(child, content, cursor, max_chars, spans);
            if cursor < end {
                split_piece(content, cursor, end, max_chars, spans);
            }
        } else {
            // Leaf too large, e.g. a long string literal
            split_piece(content, cursor, end, max_chars, spans);
        }
        cursor = end;
    }
    cursor
}

fn split_piece(content: &str, start: usize, end: usize, max_chars: usize, spans: &mut Vec<Span>) {
    recursive::tile(content, start, end, SeparatorSet::Plain.separators(), max_chars, spans);
}

fn ceil_char_boundary(content: &str, mut idx: usize) -> usize {
    idx = idx.min(content.len());
    while !content.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// Count total nodes and error nodes in a tree.
fn count_nodes(node: tree_sitter::Node) -> (usize, usize) {
    let mut total = 1usize;
    let mut errors = if node.is_error() || node.is_missing() { 1usize } else { 0 };

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let (t, e) = count_nodes(child);
        total += t;
        errors += e;
    }

    (total, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::recursive::merge;

    fn chunk(source: &str, language: SyntaxLanguage, size: usize) -> Vec<String> {
        let spans = syntax_spans(source, language, size).unwrap();
        merge(source, &spans, size, 0)
            .into_iter()
            .map(|c| c.content)
            .collect()
    }

    #[test]
    fn test_spans_tile_the_source() {
        let source = "use std::io;\n\n// helper\nfn a() {}\n\nfn b() { let x = 1; }\n";
        let spans = syntax_spans(source, SyntaxLanguage::Rust, 2000).unwrap();
        let rebuilt: String = spans.iter().map(|s| &source[s.start..s.end]).collect();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn test_chunk_rust_functions() {
        let source = r#"
fn hello() {
    println!("hello");
}

fn world() {
    println!("world");
}
"#;
        let chunks = chunk(source, SyntaxLanguage::Rust, 2000);
        // Both functions are small and should be merged into one chunk
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("fn hello"));
        assert!(chunks[0].contains("fn world"));
    }

    #[test]
    fn test_chunk_rust_large_function_splits() {
        let body: String = (0..150)
            .map(|i| format!("    let var_{i} = {i};\n"))
            .collect();
        let source = format!("fn big() {{\n{body}}}\n\nfn small() {{}}\n");

        let chunks = chunk(&source, SyntaxLanguage::Rust, 1000);
        assert!(chunks.len() >= 2, "Large function should be split: got {} chunks", chunks.len());
        for c in &chunks {
            assert!(c.chars().count() <= 1000);
        }
    }

    #[test]
    fn test_chunk_python_splits_at_definitions() {
        let funcs: Vec<String> = (0..6)
            .map(|i| format!("def func_{i}(x):\n{}", "    x = x + 1\n".repeat(10)))
            .collect();
        let source = funcs.join("\n");
        let chunks = chunk(&source, SyntaxLanguage::Python, 400);
        assert!(chunks.len() >= 2);
        // Boundaries fall between definitions, so every chunk starts with one
        for c in &chunks {
            assert!(c.starts_with("def func_"), "unexpected chunk start: {c:?}");
        }
    }

    #[test]
    fn test_skips_large_files() {
        let large = "x".repeat(MAX_FILE_SIZE + 1);
        assert!(matches!(
            syntax_spans(&large, SyntaxLanguage::Rust, 2000),
            Err(SplitError::TooLarge(_))
        ));
    }

    #[test]
    fn test_chunk_javascript_class() {
        let source = r#"
class MyComponent {
    constructor(name) {
        this.name = name;
    }

    render() {
        return `<div>${this.name}</div>`;
    }
}

function standalone() {
    return 42;
}
"#;
        let all = chunk(source, SyntaxLanguage::JavaScript, 2000).join("\n");
        assert!(all.contains("class MyComponent"));
        assert!(all.contains("function standalone"));
    }

    #[test]
    fn test_chunk_tsx() {
        let source = r#"
import React from 'react';

interface Props {
    name: string;
}

function Greeting({ name }: Props) {
    return <div>Hello, {name}!</div>;
}

export default Greeting;
"#;
        let all = chunk(source, SyntaxLanguage::Tsx, 2000).join("\n");
        assert!(all.contains("interface Props"));
        assert!(all.contains("function Greeting"));
    }
}
