//! Fixed-size sliding-window chunker.
//!
//! Works on the flattened document (element representations joined by a
//! blank line) and cuts it into windows of `chunk_size` characters, each
//! starting `overlap` characters before the previous one ended:
//!
//! ```text
//! flattened: |---------------------------------------------|
//! window 0:  [0 ............ size)
//! window 1:              [size-overlap ............ 2·size-overlap)
//! window 2:                            [...                     L)
//! ```
//!
//! Windows cover the whole text without gaps, and the region two
//! neighbours share is identical in both. `start_position`/`end_position`
//! are character offsets into the flattened text.
//!
//! With `respect_boundaries`, a window whose end would land inside a code
//! block, list, table, or HTML block is stretched to the end of that
//! element, so each of them appears whole in at least one window. The next
//! window still starts `overlap` characters before the (stretched) end.

use serde_json::Value;
use std::ops::Range;

use crate::config::{ChunkingConfig, METHOD_FIXED};
use crate::models::{DocumentChunk, MarkdownAst, Metadata};
use crate::strategy::ChunkingStrategy;

pub struct FixedSizeChunker;

impl ChunkingStrategy for FixedSizeChunker {
    fn name(&self) -> &str {
        METHOD_FIXED
    }

    fn description(&self) -> &str {
        "Overlapping fixed-width character windows over the flattened document"
    }

    fn chunk(&self, ast: &MarkdownAst, config: &ChunkingConfig) -> Vec<DocumentChunk> {
        let flat = ast.flatten();
        let total = flat.char_len;
        if total == 0 {
            return Vec::new();
        }

        let boundaries = flat.char_boundaries();
        let atomic: Vec<Range<usize>> = if config.respect_boundaries {
            ast.elements
                .iter()
                .zip(&flat.spans)
                .filter(|(element, _)| element.is_atomic())
                .map(|(_, span)| span.clone())
                .collect()
        } else {
            Vec::new()
        };

        let mut chunks = Vec::new();
        let mut start = 0;
        let mut shared = 0;

        loop {
            let end = stretch_over_atomic((start + config.chunk_size).min(total), &atomic);
            let content = flat.text[boundaries[start]..boundaries[end]].to_string();

            let mut metadata = Metadata::new();
            metadata.insert("overlap_chars".to_string(), Value::from(shared));
            chunks.push(DocumentChunk::unassigned(content, start, end, metadata));

            if end >= total {
                break;
            }
            shared = config.overlap;
            start = end - config.overlap;
        }

        chunks
    }
}

/// Move `end` to the end of the atomic span it falls strictly inside.
/// Spans are disjoint and sorted.
fn stretch_over_atomic(end: usize, atomic: &[Range<usize>]) -> usize {
    let idx = atomic.partition_point(|span| span.end <= end);
    match atomic.get(idx) {
        Some(span) if span.start < end => span.end,
        _ => end,
    }
}
