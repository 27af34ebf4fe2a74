//! Recursive separator splitting and overlap merging.
//!
//! Tiling strategy, applied to any piece longer than the chunk size:
//! 1. Split before every occurrence of the first separator present in the piece
//! 2. Recurse into oversized pieces with the remaining separators
//! 3. Last resort: split at character boundaries
//!
//! Separators stay attached to the start of the piece that follows them, so
//! the tiles always reassemble into the original text.

use std::collections::VecDeque;

use super::{ChunkOutput, Span};

/// Tile `text[start..end]` into spans of at most `max_chars` characters.
pub fn tile(
    text: &str,
    start: usize,
    end: usize,
    separators: &[&str],
    max_chars: usize,
    spans: &mut Vec<Span>,
) {
    if start >= end {
        return;
    }
    let piece = &text[start..end];
    if piece.chars().count() <= max_chars {
        spans.push(Span { start, end });
        return;
    }

    let chosen = separators
        .iter()
        .position(|sep| sep.is_empty() || piece.contains(sep));

    match chosen {
        Some(i) if !separators[i].is_empty() => {
            let sep = separators[i];
            let rest = &separators[i + 1..];
            let mut piece_start = start;
            for (idx, _) in piece.match_indices(sep) {
                let at = start + idx;
                if at > piece_start {
                    tile(text, piece_start, at, rest, max_chars, spans);
                    piece_start = at;
                }
            }
            tile(text, piece_start, end, rest, max_chars, spans);
        }
        _ => split_chars(text, start, end, max_chars, spans),
    }
}

fn split_chars(text: &str, start: usize, end: usize, max_chars: usize, spans: &mut Vec<Span>) {
    let mut piece_start = start;
    let mut count = 0;
    for (idx, _) in text[start..end].char_indices() {
        if count == max_chars {
            spans.push(Span {
                start: piece_start,
                end: start + idx,
            });
            piece_start = start + idx;
            count = 0;
        }
        count += 1;
    }
    if piece_start < end {
        spans.push(Span {
            start: piece_start,
            end,
        });
    }
}

/// Pack consecutive spans into windows of at most `max_chars` characters.
///
/// When the next span would overflow the window, the window is emitted and
/// spans are dropped from its front until what remains is no longer than
/// `overlap` and leaves room for the next span. The remainder is carried into
/// the next window, so neighbouring chunks share up to `overlap` characters.
pub fn merge(text: &str, spans: &[Span], max_chars: usize, overlap: usize) -> Vec<ChunkOutput> {
    let lines = LineIndex::new(text);
    let lens: Vec<usize> = spans
        .iter()
        .map(|s| text[s.start..s.end].chars().count())
        .collect();

    let mut chunks: Vec<ChunkOutput> = Vec::new();
    let mut window: VecDeque<usize> = VecDeque::new();
    let mut total = 0usize;

    for (i, &len) in lens.iter().enumerate() {
        if total + len > max_chars && !window.is_empty() {
            emit(text, spans, &window, &lines, &mut chunks);
            while let Some(&front) = window.front() {
                if total <= overlap && total + len <= max_chars {
                    break;
                }
                window.pop_front();
                total -= lens[front];
            }
        }
        window.push_back(i);
        total += len;
    }
    if !window.is_empty() {
        emit(text, spans, &window, &lines, &mut chunks);
    }

    chunks
}

fn emit(
    text: &str,
    spans: &[Span],
    window: &VecDeque<usize>,
    lines: &LineIndex,
    chunks: &mut Vec<ChunkOutput>,
) {
    let (Some(&first), Some(&last)) = (window.front(), window.back()) else {
        return;
    };
    let raw_start = spans[first].start;
    let raw = &text[raw_start..spans[last].end];

    let start = raw_start + (raw.len() - raw.trim_start().len());
    let end = raw_start + raw.trim_end().len();
    if start >= end {
        return;
    }

    // A window holding only the previous chunk's tail plus whitespace adds nothing
    if let Some(prev) = chunks.last() {
        if start >= prev.offset && end <= prev.offset + prev.content.len() {
            return;
        }
    }

    chunks.push(ChunkOutput {
        content: text[start..end].to_string(),
        offset: start,
        start_line: lines.line_of(start),
        end_line: lines.line_of(end - 1),
    });
}

/// Maps byte offsets to 1-based line numbers.
struct LineIndex {
    newlines: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        Self {
            newlines: text.match_indices('\n').map(|(i, _)| i).collect(),
        }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.newlines.partition_point(|&nl| nl < offset) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &[&str] = &["\n\n", "\n", " ", ""];

    fn tiles(text: &str, max: usize) -> Vec<Span> {
        let mut spans = Vec::new();
        tile(text, 0, text.len(), PLAIN, max, &mut spans);
        spans
    }

    #[test]
    fn test_tiles_reassemble_and_respect_limit() {
        let text = "alpha beta\n\ngamma delta epsilon\nzeta eta theta iota kappa lambda";
        let spans = tiles(text, 12);
        let rebuilt: String = spans.iter().map(|s| &text[s.start..s.end]).collect();
        assert_eq!(rebuilt, text);
        for s in &spans {
            assert!(text[s.start..s.end].chars().count() <= 12);
        }
    }

    #[test]
    fn test_hard_split_on_char_boundaries() {
        let text = "é".repeat(25);
        let spans = tiles(&text, 10);
        assert_eq!(spans.len(), 3);
        assert_eq!(text[spans[2].start..spans[2].end].chars().count(), 5);
    }

    #[test]
    fn test_merge_small_text_single_chunk() {
        let text = "line 1\nline 2\nline 3";
        let chunks = merge(text, &tiles(text, 100), 100, 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 3);
        assert_eq!(chunks[0].offset, 0);
    }

    #[test]
    fn test_merge_trims_and_tracks_lines() {
        let text = "\n\n  first block\n\nsecond block\n";
        let chunks = merge(text, &tiles(text, 15), 15, 0);
        assert_eq!(chunks[0].content, "first block");
        assert_eq!(chunks[0].start_line, 3);
        let last = chunks.last().unwrap();
        assert_eq!(last.content, "second block");
        assert_eq!(last.start_line, 5);
        assert_eq!(&text[last.offset..last.offset + last.content.len()], "second block");
    }

    #[test]
    fn test_merge_carries_overlap() {
        let text: String = (0..30).map(|i| format!("w{i:02} ")).collect();
        let chunks = merge(&text, &tiles(&text, 20), 20, 8);
        assert!(chunks.len() > 3);
        for pair in chunks.windows(2) {
            let prev_end = pair[0].offset + pair[0].content.len();
            assert!(pair[1].offset < prev_end);
        }
        assert!(chunks.iter().all(|c| c.content.chars().count() <= 20));
    }
}
