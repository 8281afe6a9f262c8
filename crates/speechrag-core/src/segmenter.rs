//! Separator-first chunking with a character budget and unit-granular overlap.
//!
//! The text is cut on `separator` into units (trimmed, empty units dropped).
//! Consecutive units are accumulated while the chunk's source span stays within
//! `chunk_size` characters. When a chunk closes, its trailing units that fit in
//! `chunk_overlap` characters seed the next chunk. A unit longer than
//! `chunk_size` becomes a chunk of its own.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::types::{Chunk, Document, Meta};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separator: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 200, chunk_overlap: 50, separator: ". ".to_string() }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be at least 1".into()));
        }
        if self.chunk_overlap > self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) is larger than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.separator.is_empty() {
            return Err(Error::InvalidConfig("separator must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Unit {
    start: usize,
    end: usize,
}

#[derive(Debug, Clone)]
pub struct Segmenter {
    config: ChunkingConfig,
}

impl Segmenter {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    pub fn split_document(&self, document: &Document) -> Vec<Chunk> {
        self.split_text(&document.text, &document.metadata())
    }

    pub fn split_text(&self, text: &str, metadata: &Meta) -> Vec<Chunk> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let mut chunks = Vec::new();
        let mut window: VecDeque<Unit> = VecDeque::new();

        for unit in units(text, &self.config.separator) {
            if let Some(&first) = window.front() {
                if span_chars(text, first.start, unit.end) > size {
                    chunks.push(make_chunk(text, &window, chunks.len(), metadata));
                    while let (Some(&first), Some(&last)) = (window.front(), window.back()) {
                        let carried = span_chars(text, first.start, last.end);
                        let with_next = span_chars(text, first.start, unit.end);
                        if carried > overlap || with_next > size {
                            window.pop_front();
                        } else {
                            break;
                        }
                    }
                }
            }
            window.push_back(unit);
        }
        if !window.is_empty() {
            chunks.push(make_chunk(text, &window, chunks.len(), metadata));
        }
        chunks
    }
}

/// Split `text` with explicit parameters and no metadata.
pub fn split(text: &str, chunk_size: usize, chunk_overlap: usize, separator: &str) -> Result<Vec<Chunk>> {
    let segmenter = Segmenter::new(ChunkingConfig {
        chunk_size,
        chunk_overlap,
        separator: separator.to_string(),
    })?;
    Ok(segmenter.split_text(text, &Meta::new()))
}

fn units(text: &str, separator: &str) -> Vec<Unit> {
    let mut units = Vec::new();
    let mut offset = 0usize;
    for piece in text.split(separator) {
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            let start = offset + (piece.len() - piece.trim_start().len());
            units.push(Unit { start, end: start + trimmed.len() });
        }
        offset += piece.len() + separator.len();
    }
    units
}

fn span_chars(text: &str, start: usize, end: usize) -> usize {
    text[start..end].chars().count()
}

fn make_chunk(text: &str, window: &VecDeque<Unit>, sequence_index: usize, metadata: &Meta) -> Chunk {
    let start = window.front().map_or(0, |u| u.start);
    let end = window.back().map_or(start, |u| u.end);
    Chunk {
        text: text[start..end].to_string(),
        sequence_index,
        start,
        end,
        metadata: metadata.clone(),
    }
}
