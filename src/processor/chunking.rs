//! # Text Chunking Module
//!
//! Splits normalized page text into bounded-size segments for a downstream
//! model with a hard per-call input limit. The boundary is an external
//! constraint, not a heuristic: chunks are exact, contiguous slices of the
//! input, never merged or re-split afterwards.
//!
//! ## Key Components
//!
//! - `chunk`: Lazy, restartable iterator over the chunks of a text
//! - `chunk_text`: Eager form returning owned strings
//! - `chunk_pages`: Per-page chunking with source and position metadata
//!
//! Lengths are counted in characters (Unicode scalar values), so a chunk
//! boundary never falls inside a multi-byte character.

use std::iter::FusedIterator;

use crate::crawler::CleanedPage;
use crate::processor::error::ProcessError;
use serde::Serialize;
use tracing::{debug, instrument};

/// Default maximum chunk length in characters
pub const DEFAULT_MAX_CHUNK_LENGTH: usize = 5000;

/// A chunk of page text with its origin
#[derive(Debug, Clone, Serialize)]
pub struct TextChunk {
    /// The text of the chunk
    pub text: String,

    /// The position of the chunk within its page
    pub position: usize,

    /// The page the chunk was cut from
    pub source_url: String,
}

/// Iterator over consecutive slices of at most `max_length` characters
///
/// Cloning the iterator restarts nothing but is cheap, so a fresh pass over the
/// same text is just another clone taken before iterating.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    rest: &'a str,
    max_length: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let end = self
            .rest
            .char_indices()
            .nth(self.max_length)
            .map_or(self.rest.len(), |(index, _)| index);
        let (head, tail) = self.rest.split_at(end);
        self.rest = tail;
        Some(head)
    }
}

impl FusedIterator for Chunks<'_> {}

/// Split text into chunks of at most `max_length` characters
///
/// # Arguments
///
/// * `text` - The text to split
/// * `max_length` - Maximum chunk length in characters; must be positive
///
/// # Returns
///
/// A lazy iterator covering `text` exactly once, in order
pub fn chunk(text: &str, max_length: usize) -> Result<Chunks<'_>, ProcessError> {
    if max_length == 0 {
        return Err(ProcessError::InvalidArgument(
            "max_length must be greater than zero".to_string(),
        ));
    }
    Ok(Chunks {
        rest: text,
        max_length,
    })
}

/// Eager variant of [`chunk`]
pub fn chunk_text(text: &str, max_length: usize) -> Result<Vec<String>, ProcessError> {
    Ok(chunk(text, max_length)?.map(str::to_string).collect())
}

/// Chunk every page separately, keeping the source URL on each chunk
#[instrument(skip(pages))]
pub fn chunk_pages(pages: &[CleanedPage], max_length: usize) -> Result<Vec<TextChunk>, ProcessError> {
    let mut chunks = Vec::new();
    for page in pages {
        for (position, text) in chunk(&page.text, max_length)?.enumerate() {
            chunks.push(TextChunk {
                text: text.to_string(),
                position,
                source_url: page.source_url.clone(),
            });
        }
    }
    debug!("Split {} pages into {} chunks", pages.len(), chunks.len());
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text() -> String {
        (0..700)
            .map(|i| format!("line {i} of the listing"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_chunks_cover_text_exactly() {
        let text = sample_text();
        for max_length in [1, 7, 100, 5000, text.len(), text.len() + 1] {
            let chunks: Vec<&str> = chunk(&text, max_length).unwrap().collect();
            assert_eq!(chunks.concat(), text);
            let (last, full) = chunks.split_last().unwrap();
            assert!(full.iter().all(|c| c.chars().count() == max_length));
            assert!(!last.is_empty() && last.chars().count() <= max_length);
        }
    }

    #[test]
    fn test_default_size_matches_downstream_limit() {
        let text = "x".repeat(12_000);
        let lengths: Vec<usize> = chunk(&text, DEFAULT_MAX_CHUNK_LENGTH)
            .unwrap()
            .map(str::len)
            .collect();
        assert_eq!(lengths, vec![5000, 5000, 2000]);
    }

    #[test]
    fn test_multibyte_characters_are_never_split() {
        let text = "héllo wörld ☃☃☃ ✓";
        let chunks: Vec<&str> = chunk(text, 4).unwrap().collect();
        assert_eq!(chunks, vec!["héll", "o wö", "rld ", "☃☃☃ ", "✓"]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert_eq!(chunk("", 10).unwrap().count(), 0);
    }

    #[test]
    fn test_zero_length_is_rejected() {
        assert!(matches!(
            chunk("abc", 0),
            Err(ProcessError::InvalidArgument(_))
        ));
        assert!(chunk_text("abc", 0).is_err());
    }

    #[test]
    fn test_iterator_is_restartable() {
        let chunks = chunk("abcdefg", 3).unwrap();
        let first: Vec<&str> = chunks.clone().collect();
        let second: Vec<&str> = chunks.collect();
        assert_eq!(first, second);
        assert_eq!(first, vec!["abc", "def", "g"]);
    }

    #[test]
    fn test_chunk_pages_keeps_origin() {
        let pages = vec![
            CleanedPage {
                source_url: "https://a.example/1".to_string(),
                text: "abcde".to_string(),
            },
            CleanedPage {
                source_url: "https://a.example/2".to_string(),
                text: "fg".to_string(),
            },
        ];
        let chunks = chunk_pages(&pages, 2).unwrap();
        let summary: Vec<(&str, usize, &str)> = chunks
            .iter()
            .map(|c| (c.text.as_str(), c.position, c.source_url.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("ab", 0, "https://a.example/1"),
                ("cd", 1, "https://a.example/1"),
                ("e", 2, "https://a.example/1"),
                ("fg", 0, "https://a.example/2"),
            ]
        );
    }
}
