//! Recursive character splitting with overlapping boundaries.
//!
//! Text is first normalized (line endings unified, surrounding whitespace trimmed) and then cut
//! along a hierarchy of separators, most structural first: paragraphs, lines, sentence stops,
//! words. Pieces that still exceed the size budget are re-split with the next separator; a piece
//! that no separator can break is emitted whole rather than dropping content.
//!
//! Adjacent pieces are merged greedily into chunks of at most `max_size` characters. When a chunk
//! is emitted, its trailing pieces (up to `overlap` characters) are carried into the next one so
//! that context around a boundary stays visible to retrieval.
//!
//! Separators stay attached to the end of the piece they terminate, so chunk boundaries are exact
//! slices of the normalized text and stripping the overlaps reconstructs it. Emitted chunks are
//! trimmed.

use std::collections::VecDeque;
use std::ops::Range;

use super::types::ChunkingError;

/// Default separator hierarchy: paragraphs, lines, sentences, words.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", ".", " "];
/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap between adjacent chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 300;

/// Unify line endings and trim surrounding whitespace.
pub fn normalize_text(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}

/// Splits documents into overlapping chunks using a recursive separator hierarchy.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    max_size: usize,
    overlap: usize,
    separators: Vec<String>,
}

#[derive(Debug, Clone)]
struct Piece {
    range: Range<usize>,
    chars: usize,
}

impl TextSplitter {
    /// Build a splitter using [`DEFAULT_SEPARATORS`].
    pub fn new(max_size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        Self::with_separators(max_size, overlap, DEFAULT_SEPARATORS)
    }

    /// Build a splitter with a custom separator hierarchy (most structural first).
    ///
    /// Empty separators are ignored.
    pub fn with_separators<I, S>(
        max_size: usize,
        overlap: usize,
        separators: I,
    ) -> Result<Self, ChunkingError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if max_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if overlap >= max_size {
            return Err(ChunkingError::InvalidOverlap { overlap, max_size });
        }

        let separators: Vec<String> = separators
            .into_iter()
            .map(Into::into)
            .filter(|separator: &String| !separator.is_empty())
            .collect();

        Ok(Self {
            max_size,
            overlap,
            separators,
        })
    }

    /// Maximum chunk length in characters.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Characters shared between adjacent chunks.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into ordered, overlapping chunks.
    ///
    /// Chunks are trimmed and whitespace-only fragments are dropped. Returns an empty
    /// vector when the text is blank after normalization.
    pub fn split(&self, text: &str) -> Vec<String> {
        let normalized = normalize_text(text);
        let chunks: Vec<String> = self
            .spans(&normalized)
            .into_iter()
            .map(|range| normalized[range].trim())
            .filter(|chunk| !chunk.is_empty())
            .map(str::to_string)
            .collect();
        tracing::debug!(
            chunks = chunks.len(),
            max_size = self.max_size,
            overlap = self.overlap,
            "Split text into chunks"
        );
        chunks
    }

    /// Byte ranges of each chunk within already normalized text.
    fn spans(&self, text: &str) -> Vec<Range<usize>> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        self.split_recursive(text, 0, &self.separators, &mut chunks);
        chunks
    }

    fn split_recursive(
        &self,
        text: &str,
        offset: usize,
        separators: &[String],
        out: &mut Vec<Range<usize>>,
    ) {
        let Some(position) = separators
            .iter()
            .position(|separator| text.contains(separator.as_str()))
        else {
            out.push(offset..offset + text.len());
            return;
        };
        let separator = &separators[position];
        let remaining = &separators[position + 1..];

        let mut pending = Vec::new();
        for local in split_keeping_separator(text, separator) {
            let chars = text[local.clone()].chars().count();
            if chars <= self.max_size {
                pending.push(Piece {
                    range: offset + local.start..offset + local.end,
                    chars,
                });
                continue;
            }

            self.merge(&pending, out);
            pending.clear();

            if remaining.is_empty() {
                out.push(offset + local.start..offset + local.end);
            } else {
                self.split_recursive(&text[local.clone()], offset + local.start, remaining, out);
            }
        }
        self.merge(&pending, out);
    }

    fn merge(&self, pieces: &[Piece], out: &mut Vec<Range<usize>>) {
        let mut window: VecDeque<&Piece> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            if total + piece.chars > self.max_size && !window.is_empty() {
                out.push(window_span(&window));
                while total > self.overlap || (total + piece.chars > self.max_size && total > 0) {
                    match window.pop_front() {
                        Some(front) => total -= front.chars,
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += piece.chars;
        }

        if !window.is_empty() {
            out.push(window_span(&window));
        }
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn window_span(window: &VecDeque<&Piece>) -> Range<usize> {
    let start = window.front().map_or(0, |piece| piece.range.start);
    let end = window.back().map_or(start, |piece| piece.range.end);
    start..end
}

/// Split on `separator`, keeping it at the end of the piece it terminates.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for (index, matched) in text.match_indices(separator) {
        let end = index + matched.len();
        ranges.push(start..end);
        start = end;
    }
    if start < text.len() {
        ranges.push(start..text.len());
    }
    ranges
}
