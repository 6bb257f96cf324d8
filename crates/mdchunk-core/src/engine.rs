//! Chunking engine: strategy dispatch and chunk metadata stamping.
//!
//! The engine owns a validated [`ChunkingConfig`] and a
//! [`StrategyRegistry`]. Both are fixed at construction, so one engine can
//! be shared by reference across threads.
//!
//! # Output guarantees
//!
//! For an output list of length `N`, every chunk carries:
//!
//! | Key | Value |
//! |-----|-------|
//! | `chunk_index` | 0-based position in the list |
//! | `total_chunks` | `N` |
//! | `chunk_method` | the configured method |
//! | `content_hash` | SHA-256 hex of `content` |
//! | `char_count` | characters in `content` |
//!
//! These keys override same-named keys from the strategy or the caller.
//! Ids are UUID v5 values derived from the caller's `source` (if any), the
//! method, the index, and the content hash, so repeated runs over the same
//! input produce the same ids.

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::error::{ChunkError, Result};
use crate::models::{DocumentChunk, MarkdownAst, Metadata};
use crate::strategy::StrategyRegistry;

pub struct ChunkingEngine {
    config: ChunkingConfig,
    registry: StrategyRegistry,
}

impl ChunkingEngine {
    /// Engine over the built-in `structure` and `fixed` strategies.
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        Self::with_registry(config, StrategyRegistry::builtin())
    }

    /// Engine over a caller-assembled registry.
    ///
    /// Fails with [`ChunkError::InvalidConfig`] when the numeric invariants
    /// of `config` do not hold. The method is looked up per call.
    pub fn with_registry(config: ChunkingConfig, registry: StrategyRegistry) -> Result<Self> {
        config.validate()?;
        if let Some(max_tokens) = config.max_tokens {
            warn!(max_tokens, "max_tokens is accepted but not enforced");
        }
        Ok(Self { config, registry })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.registry.names()
    }

    /// Chunk a parsed document.
    ///
    /// An AST with no elements yields `Ok(vec![])` whatever the config. An
    /// unregistered method yields [`ChunkError::UnknownStrategy`] and no
    /// chunks.
    pub fn chunk_document(&self, ast: &MarkdownAst) -> Result<Vec<DocumentChunk>> {
        self.chunk_document_with_metadata(ast, &Metadata::new())
    }

    /// Like [`chunk_document`](Self::chunk_document), merging `custom`
    /// into every chunk's metadata underneath the engine-owned keys.
    pub fn chunk_document_with_metadata(
        &self,
        ast: &MarkdownAst,
        custom: &Metadata,
    ) -> Result<Vec<DocumentChunk>> {
        if ast.is_empty() {
            return Ok(Vec::new());
        }

        let method = self.config.method.as_str();
        let strategy = self
            .registry
            .get(method)
            .ok_or_else(|| ChunkError::UnknownStrategy(method.to_string()))?;

        let mut chunks: Vec<DocumentChunk> = strategy
            .chunk(ast, &self.config)
            .into_iter()
            .filter(|chunk| !chunk.content.trim().is_empty())
            .collect();

        let total = chunks.len();
        let source = custom.get("source").and_then(Value::as_str).unwrap_or("");

        for (index, chunk) in chunks.iter_mut().enumerate() {
            let hash = content_hash(&chunk.content);

            let mut metadata = custom.clone();
            metadata.append(&mut chunk.metadata);
            metadata.insert(
                "char_count".to_string(),
                Value::from(chunk.content.chars().count()),
            );
            metadata.insert("content_hash".to_string(), Value::from(hash.as_str()));
            metadata.insert("chunk_index".to_string(), Value::from(index));
            metadata.insert("total_chunks".to_string(), Value::from(total));
            metadata.insert("chunk_method".to_string(), Value::from(method));

            chunk.id = chunk_id(source, method, index, &hash);
            chunk.metadata = metadata;
        }

        debug!(method, chunks = total, "chunked document");
        Ok(chunks)
    }
}

/// SHA-256 hex digest of chunk text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn chunk_id(source: &str, method: &str, index: usize, hash: &str) -> String {
    let name = format!("{}:{}:{}:{}", source, method, index, hash);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{METHOD_FIXED, METHOD_STRUCTURE};
    use crate::error::ErrorKind;
    use crate::parser::parse;
    use crate::strategy::ChunkingStrategy;
    use serde_json::json;

    const DOC: &str = "# Chapter 1\n\nIntro.\n\n## Section 1.1\n\nBody.\n\n# Chapter 2\n\nIntro2.";

    fn engine(method: &str) -> ChunkingEngine {
        ChunkingEngine::new(ChunkingConfig::new(100, 20, method).unwrap()).unwrap()
    }

    #[test]
    fn test_empty_ast_is_empty_success() {
        for method in [METHOD_STRUCTURE, METHOD_FIXED, "invalid_method"] {
            let chunks = engine(method).chunk_document(&MarkdownAst::default()).unwrap();
            assert!(chunks.is_empty());
        }
    }

    #[test]
    fn test_unknown_method_is_processing_error() {
        let err = engine("invalid_method")
            .chunk_document(&parse(DOC))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Processing);
        assert!(err.to_string().contains("Unknown chunking strategy"));
        assert!(err.to_string().contains("invalid_method"));
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = ChunkingConfig {
            overlap: 1200,
            chunk_size: 1000,
            ..ChunkingConfig::default()
        };
        let err = ChunkingEngine::new(config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_metadata_stamped() {
        let chunks = engine(METHOD_STRUCTURE).chunk_document(&parse(DOC)).unwrap();
        assert_eq!(chunks.len(), 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index(), Some(i as u64));
            assert_eq!(chunk.total_chunks(), Some(3));
            assert_eq!(chunk.metadata["chunk_method"], json!("structure"));
            assert_eq!(
                chunk.metadata["content_hash"],
                json!(content_hash(&chunk.content))
            );
        }
    }

    #[test]
    fn test_custom_metadata_merged_under_engine_keys() {
        let mut custom = Metadata::new();
        custom.insert("source".to_string(), json!("docs/guide.md"));
        custom.insert("chunk_index".to_string(), json!(99));
        custom.insert("chunk_method".to_string(), json!("mine"));

        let chunks = engine(METHOD_FIXED)
            .chunk_document_with_metadata(&parse(DOC), &custom)
            .unwrap();
        assert_eq!(chunks[0].metadata["source"], json!("docs/guide.md"));
        assert_eq!(chunks[0].metadata["chunk_index"], json!(0));
        assert_eq!(chunks[0].metadata["chunk_method"], json!("fixed"));
    }

    #[test]
    fn test_ids_deterministic_and_unique() {
        let ast = parse(DOC);
        let first = engine(METHOD_FIXED).chunk_document(&ast).unwrap();
        let second = engine(METHOD_FIXED).chunk_document(&ast).unwrap();
        assert_eq!(first, second);

        let mut ids: Vec<&str> = first.iter().map(|c| c.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), first.len());
    }

    #[test]
    fn test_ids_depend_on_source() {
        let ast = parse(DOC);
        let engine = engine(METHOD_STRUCTURE);
        let mut a = Metadata::new();
        a.insert("source".to_string(), json!("a.md"));
        let mut b = Metadata::new();
        b.insert("source".to_string(), json!("b.md"));

        let from_a = engine.chunk_document_with_metadata(&ast, &a).unwrap();
        let from_b = engine.chunk_document_with_metadata(&ast, &b).unwrap();
        assert_ne!(from_a[0].id, from_b[0].id);
        assert_eq!(from_a[0].content, from_b[0].content);
    }

    struct Blank;

    impl ChunkingStrategy for Blank {
        fn name(&self) -> &str {
            "blank"
        }

        fn description(&self) -> &str {
            "Emits whitespace and one real chunk"
        }

        fn chunk(&self, _ast: &MarkdownAst, _config: &ChunkingConfig) -> Vec<DocumentChunk> {
            vec![
                DocumentChunk::unassigned("   \n ".to_string(), 0, 5, Metadata::new()),
                DocumentChunk::unassigned("real".to_string(), 5, 9, Metadata::new()),
            ]
        }
    }

    #[test]
    fn test_whitespace_chunks_dropped_before_indexing() {
        let mut registry = StrategyRegistry::new();
        registry.register(Box::new(Blank));
        let config = ChunkingConfig::new(100, 0, "blank").unwrap();
        let engine = ChunkingEngine::with_registry(config, registry).unwrap();

        let chunks = engine.chunk_document(&parse("text")).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "real");
        assert_eq!(chunks[0].chunk_index(), Some(0));
        assert_eq!(chunks[0].total_chunks(), Some(1));
    }

    #[test]
    fn test_dash_only_table_still_chunked() {
        for method in [METHOD_STRUCTURE, METHOD_FIXED] {
            let chunks = engine(method).chunk_document(&parse("|---|")).unwrap();
            assert_eq!(chunks.len(), 1, "{method}");
            assert!(chunks[0].content.contains("---"));
        }
    }

    #[test]
    fn test_engine_shared_across_threads() {
        let engine = engine(METHOD_STRUCTURE);
        let ast = parse(DOC);
        let expected = engine.chunk_document(&ast).unwrap();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| engine.chunk_document(&ast).unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}
