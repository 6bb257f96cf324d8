//! Structure-aware chunker.
//!
//! Packs whole elements into chunks in a single greedy pass. Elements are
//! never split, so the chunk size is a target rather than a hard bound: an
//! element larger than `chunk_size` forms a chunk of its own.
//!
//! # Algorithm
//!
//! 1. Keep a buffer of consecutive elements and its length (element
//!    representations plus a 2-char separator between neighbours).
//! 2. For each element, flush the buffer first if it is non-empty and
//!    either appending would push it *over* `chunk_size`, or the element is
//!    a header and `respect_boundaries` is set.
//! 3. Append the element.
//! 4. Flush whatever is left.
//!
//! Landing exactly on `chunk_size` keeps the element in the current chunk.
//! No content is repeated between chunks; `overlap` only applies to the
//! fixed-size strategy.

use serde_json::Value;
use std::ops::Range;

use crate::config::{ChunkingConfig, METHOD_STRUCTURE};
use crate::models::{
    DocumentChunk, FlattenedText, MarkdownAst, MarkdownElement, Metadata, ELEMENT_SEPARATOR_LEN,
};
use crate::strategy::ChunkingStrategy;

pub struct StructureAwareChunker;

impl ChunkingStrategy for StructureAwareChunker {
    fn name(&self) -> &str {
        METHOD_STRUCTURE
    }

    fn description(&self) -> &str {
        "Packs whole markdown elements into chunks; headers start new chunks"
    }

    fn chunk(&self, ast: &MarkdownAst, config: &ChunkingConfig) -> Vec<DocumentChunk> {
        let flat = ast.flatten();
        let boundaries = flat.char_boundaries();
        let mut packer = Packer::new(&flat, &boundaries);
        let mut trail = HeadingTrail::default();

        for (i, element) in ast.elements.iter().enumerate() {
            let len = flat.spans[i].len();
            let starts_section = element.is_header() && config.respect_boundaries;
            if !packer.is_empty() && (packer.len_with(len) > config.chunk_size || starts_section) {
                packer.flush(&ast.elements);
            }

            if let MarkdownElement::Header { level, text } = element {
                trail.enter(*level, text);
            }
            if packer.is_empty() {
                packer.begin(i, len, trail.path());
            } else {
                packer.extend(i, len);
            }
        }
        packer.flush(&ast.elements);

        packer.chunks
    }
}

/// Headers currently in force, outermost first.
#[derive(Default)]
struct HeadingTrail {
    stack: Vec<(u8, String)>,
}

impl HeadingTrail {
    fn enter(&mut self, level: u8, text: &str) {
        while self.stack.last().map(|(l, _)| *l >= level).unwrap_or(false) {
            self.stack.pop();
        }
        self.stack.push((level, text.to_string()));
    }

    fn path(&self) -> Vec<String> {
        self.stack.iter().map(|(_, text)| text.clone()).collect()
    }
}

struct Packer<'a> {
    flat: &'a FlattenedText,
    boundaries: &'a [usize],
    elements: Option<Range<usize>>,
    len: usize,
    heading_path: Vec<String>,
    chunks: Vec<DocumentChunk>,
}

impl<'a> Packer<'a> {
    fn new(flat: &'a FlattenedText, boundaries: &'a [usize]) -> Self {
        Self {
            flat,
            boundaries,
            elements: None,
            len: 0,
            heading_path: Vec::new(),
            chunks: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.elements.is_none()
    }

    /// Buffer length after appending an element of `len` chars.
    fn len_with(&self, len: usize) -> usize {
        self.len + ELEMENT_SEPARATOR_LEN + len
    }

    fn begin(&mut self, index: usize, len: usize, heading_path: Vec<String>) {
        self.elements = Some(index..index + 1);
        self.len = len;
        self.heading_path = heading_path;
    }

    fn extend(&mut self, index: usize, len: usize) {
        if let Some(range) = self.elements.as_mut() {
            range.end = index + 1;
        }
        self.len = self.len_with(len);
    }

    fn flush(&mut self, elements: &[MarkdownElement]) {
        let Some(range) = self.elements.take() else {
            return;
        };
        let start = self.flat.spans[range.start].start;
        let end = self.flat.spans[range.end - 1].end;
        let content = self.flat.text[self.boundaries[start]..self.boundaries[end]].to_string();

        let mut metadata = Metadata::new();
        metadata.insert(
            "element_types".to_string(),
            Value::from(
                elements[range.clone()]
                    .iter()
                    .map(|e| e.kind())
                    .collect::<Vec<_>>(),
            ),
        );
        metadata.insert("element_count".to_string(), Value::from(range.len()));
        metadata.insert(
            "heading_path".to_string(),
            Value::from(std::mem::take(&mut self.heading_path)),
        );

        self.chunks
            .push(DocumentChunk::unassigned(content, start, end, metadata));
        self.len = 0;
    }
}
