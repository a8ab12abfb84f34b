//! Text chunking with configurable size and overlap
//!
//! Chunk boundaries follow a fixed stride: chunk `i` starts `chunk_size -
//! overlap` characters after chunk `i-1`, adjusted toward the nearest
//! separator so chunks break at paragraph, line, or word boundaries when one
//! exists late enough in the window. Re-chunking the same text with the same
//! parameters always yields the same sequence.

use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};

/// Separators tried in priority order when picking a break point, coarsest
/// first. A separator is only honored in the trailing half of the window.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// A chunk of source text. Offsets are in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk text, an exact substring of the source
    pub text: String,
    /// Start position in the source text
    pub char_start: usize,
    /// End position in the source text (exclusive)
    pub char_end: usize,
    /// Zero-based position of this chunk within its document
    pub index: u32,
}

/// Text chunker with configurable size and overlap
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker. The overlap must be smaller than the chunk size.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidArgument("chunk size must be positive".into()));
        }
        if overlap >= chunk_size {
            return Err(Error::InvalidArgument(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Split text into overlapping chunks.
    ///
    /// Empty input yields no chunks; input shorter than the chunk size
    /// yields exactly one. Whitespace-only chunks are dropped.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every character boundary, including the end.
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain([text.len()])
            .collect();
        let total_chars = bounds.len() - 1;

        let mut chunks = Vec::new();
        let mut start = 0usize;
        let mut index = 0u32;

        loop {
            let window_end = (start + self.chunk_size).min(total_chars);
            let end = if window_end == total_chars {
                window_end
            } else {
                self.break_position(text, &bounds, start, window_end)
            };

            let slice = &text[bounds[start]..bounds[end]];
            if !slice.trim().is_empty() {
                chunks.push(Chunk {
                    text: slice.to_string(),
                    char_start: start,
                    char_end: end,
                    index,
                });
                index += 1;
            }

            if window_end == total_chars {
                break;
            }
            start = end.saturating_sub(self.overlap).max(start + 1);
        }

        chunks
    }

    /// Pick the break for a full window starting at `start`. Falls through
    /// the separator priority list; hard-cuts at the window edge (snapped to
    /// a grapheme boundary) when no separator lands late enough.
    fn break_position(
        &self,
        text: &str,
        bounds: &[usize],
        start: usize,
        window_end: usize,
    ) -> usize {
        let min_break = start + self.chunk_size / 2;
        let window = &text[bounds[start]..bounds[window_end]];

        for separator in SEPARATORS {
            if let Some(pos) = window.rfind(separator) {
                let break_byte = bounds[start] + pos + separator.len();
                let break_char = char_position(bounds, break_byte);
                if break_char > min_break {
                    return break_char;
                }
            }
        }

        let tail = &text[bounds[start]..];
        let cut = bounds[window_end] - bounds[start];
        let snapped = bounds[start] + snap_to_grapheme(tail, cut);
        char_position(bounds, snapped).max(start + 1)
    }
}

/// Map a byte offset (known to be a char boundary) to its char position.
fn char_position(bounds: &[usize], byte_offset: usize) -> usize {
    bounds.binary_search(&byte_offset).unwrap_or_else(|pos| pos)
}

/// Walk a byte position back to the nearest grapheme-cluster boundary so a
/// hard cut never splits a user-perceived character. The iterator is lazy,
/// so only the text up to the cut is scanned.
fn snap_to_grapheme(text: &str, byte_pos: usize) -> usize {
    if byte_pos >= text.len() {
        return text.len();
    }
    let mut boundary = 0;
    for (offset, _) in text.grapheme_indices(true) {
        if offset > byte_pos {
            break;
        }
        boundary = offset;
    }
    boundary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits(len: usize) -> String {
        (0..len).map(|i| char::from(b'0' + (i % 10) as u8)).collect()
    }

    fn chars_of(chunk: &Chunk) -> Vec<char> {
        chunk.text.chars().collect()
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = TextChunker::new(1000, 200).unwrap();
        assert!(chunker.split("").is_empty());
    }

    #[test]
    fn whitespace_only_text_yields_no_chunks() {
        let chunker = TextChunker::new(4, 1).unwrap();
        assert!(chunker.split("   \n\n   ").is_empty());
    }

    #[test]
    fn short_text_yields_one_chunk() {
        let chunker = TextChunker::new(1000, 200).unwrap();
        let chunks = chunker.split("hello world");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello world");
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn rechunking_is_deterministic() {
        let text = format!("{}\n\n{}", digits(1500), digits(900));
        let chunker = TextChunker::new(1000, 200).unwrap();
        assert_eq!(chunker.split(&text), chunker.split(&text));
    }

    #[test]
    fn windows_stride_by_size_minus_overlap() {
        // No separators, so every cut is a hard cut at the window edge.
        let text = digits(2400);
        let chunker = TextChunker::new(1000, 200).unwrap();
        let chunks = chunker.split(&text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks.iter().map(|c| c.char_start).collect::<Vec<_>>(),
            vec![0, 800, 1600]
        );
        assert_eq!(
            chunks.iter().map(|c| c.text.chars().count()).collect::<Vec<_>>(),
            vec![1000, 1000, 800]
        );
        assert_eq!(
            chunks.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn consecutive_chunks_share_the_overlap_span() {
        let text = digits(2400);
        let chunker = TextChunker::new(1000, 200).unwrap();
        let chunks = chunker.split(&text);

        for pair in chunks.windows(2) {
            let prev = chars_of(&pair[0]);
            let next = chars_of(&pair[1]);
            assert_eq!(prev[prev.len() - 200..], next[..200]);
        }
    }

    #[test]
    fn prefers_paragraph_breaks() {
        let text = format!("{}\n\n{}", "a".repeat(700), "b".repeat(600));
        let chunker = TextChunker::new(1000, 100).unwrap();
        let chunks = chunker.split(&text);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.ends_with("\n\n"));
        assert_eq!(chunks[0].char_end, 702);
        assert_eq!(chunks[1].char_start, 602);
    }

    #[test]
    fn falls_back_to_word_boundary() {
        let text = format!("{} {}", "x".repeat(800), "y".repeat(400));
        let chunker = TextChunker::new(1000, 0).unwrap();
        let chunks = chunker.split(&text);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.ends_with(' '));
        assert_eq!(chunks[0].char_end, 801);
    }

    #[test]
    fn ignores_separators_early_in_the_window() {
        let text = format!("ab {}", "x".repeat(1500));
        let chunker = TextChunker::new(1000, 0).unwrap();
        let chunks = chunker.split(&text);

        // The only space sits at position 2, far before the half-window
        // mark, so the first cut is a hard cut at the full window.
        assert_eq!(chunks[0].text.chars().count(), 1000);
    }

    #[test]
    fn multibyte_text_chunks_on_char_boundaries() {
        let text = "é".repeat(30);
        let chunker = TextChunker::new(10, 2).unwrap();
        let chunks = chunker.split(&text);

        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].text.chars().count(), 10);
        assert_eq!(chunks[3].text.chars().count(), 6);
        for chunk in &chunks {
            assert!(chunk.text.chars().all(|c| c == 'é'));
        }
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(
            TextChunker::new(0, 0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            TextChunker::new(100, 100),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            TextChunker::new(100, 150),
            Err(Error::InvalidArgument(_))
        ));
    }
}
