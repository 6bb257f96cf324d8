//! # mdchunk core
//!
//! Pure parsing and chunking logic for mdchunk: markdown is parsed into a
//! typed block-level AST, and the AST is partitioned into size-bounded
//! chunks for embedding and indexing.
//!
//! This crate performs no I/O and keeps no state between calls. The outer
//! `mdchunk` crate owns file access, byte decoding, config files, and output.
//!
//! ```text
//! text ──▶ parser::parse ──▶ MarkdownAst ──▶ ChunkingEngine ──▶ Vec<DocumentChunk>
//!                                              │
//!                                   StrategyRegistry lookup
//!                                   ├── "structure"
//!                                   └── "fixed"
//! ```
//!
//! ## Example
//!
//! ```rust
//! use mdchunk_core::{parse, ChunkingConfig, ChunkingEngine};
//!
//! let ast = parse("# Title\n\nSome text.\n\n## Part\n\nMore text.");
//! let engine = ChunkingEngine::new(ChunkingConfig::new(200, 0, "structure").unwrap()).unwrap();
//! let chunks = engine.chunk_document(&ast).unwrap();
//! assert_eq!(chunks.len(), 2);
//! assert!(chunks[0].content.starts_with("# Title"));
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | `MarkdownElement`, `MarkdownAst`, `DocumentChunk` |
//! | [`frontmatter`] | YAML frontmatter extraction with silent fallback |
//! | [`parser`] | Block-level markdown parser |
//! | [`config`] | `ChunkingConfig` and validation |
//! | [`strategy`] | `ChunkingStrategy` trait and registry |
//! | [`structure`] | Structure-aware element packing |
//! | [`fixed`] | Fixed-size overlapping windows |
//! | [`engine`] | Dispatch, ids, and metadata stamping |
//! | [`error`] | `ChunkError` and its kinds |

pub mod config;
pub mod engine;
pub mod error;
pub mod fixed;
pub mod frontmatter;
pub mod models;
pub mod parser;
pub mod strategy;
pub mod structure;

pub use config::ChunkingConfig;
pub use engine::ChunkingEngine;
pub use error::{ChunkError, ErrorKind};
pub use fixed::FixedSizeChunker;
pub use frontmatter::extract_frontmatter;
pub use models::{DocumentChunk, MarkdownAst, MarkdownElement, Metadata};
pub use parser::parse;
pub use strategy::{ChunkingStrategy, StrategyRegistry};
pub use structure::StructureAwareChunker;
