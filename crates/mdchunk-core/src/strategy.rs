//! Chunking strategy trait and the name → strategy registry.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │          StrategyRegistry            │
//! │  "structure" → StructureAwareChunker │
//! │  "fixed"     → FixedSizeChunker      │
//! │  "<custom>"  → Box<dyn Strategy>     │
//! └──────────────────┬───────────────────┘
//!                    ▼
//!        ChunkingEngine::chunk_document()
//! ```
//!
//! Strategies return chunks without ids and without the engine-owned
//! metadata keys (`chunk_index`, `total_chunks`, `chunk_method`); the
//! engine stamps those after the strategy returns.

use std::collections::BTreeMap;

use crate::config::ChunkingConfig;
use crate::fixed::FixedSizeChunker;
use crate::models::{DocumentChunk, MarkdownAst};
use crate::structure::StructureAwareChunker;

/// A way of partitioning a parsed document into chunks.
///
/// Implementations must be deterministic: the same `(ast, config)` pair
/// always yields the same chunks in the same order. They must not split an
/// atomic element's content across two chunks.
pub trait ChunkingStrategy: Send + Sync {
    /// Registry key, e.g. `"structure"`.
    fn name(&self) -> &str;

    /// One-line description for listings.
    fn description(&self) -> &str;

    fn chunk(&self, ast: &MarkdownAst, config: &ChunkingConfig) -> Vec<DocumentChunk>;
}

/// Name → strategy map. Iterates in name order.
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, Box<dyn ChunkingStrategy>>,
}

impl StrategyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in `structure` and `fixed` strategies.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(StructureAwareChunker));
        registry.register(Box::new(FixedSizeChunker));
        registry
    }

    /// Register a strategy under its own name, replacing any previous
    /// strategy with that name.
    pub fn register(&mut self, strategy: Box<dyn ChunkingStrategy>) {
        self.strategies.insert(strategy.name().to_string(), strategy);
    }

    pub fn get(&self, name: &str) -> Option<&dyn ChunkingStrategy> {
        self.strategies.get(name).map(|s| s.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }

    pub fn strategies(&self) -> impl Iterator<Item = &dyn ChunkingStrategy> {
        self.strategies.values().map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;

    struct WholeDocument;

    impl ChunkingStrategy for WholeDocument {
        fn name(&self) -> &str {
            "whole"
        }

        fn description(&self) -> &str {
            "One chunk per document"
        }

        fn chunk(&self, ast: &MarkdownAst, _config: &ChunkingConfig) -> Vec<DocumentChunk> {
            let flat = ast.flatten();
            vec![DocumentChunk::unassigned(
                flat.text,
                0,
                flat.char_len,
                Metadata::new(),
            )]
        }
    }

    #[test]
    fn test_builtin_names() {
        let registry = StrategyRegistry::builtin();
        assert_eq!(registry.names(), vec!["fixed", "structure"]);
        assert!(registry.contains("structure"));
        assert!(registry.get("semantic").is_none());
    }

    #[test]
    fn test_register_custom_strategy() {
        let mut registry = StrategyRegistry::builtin();
        registry.register(Box::new(WholeDocument));
        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.get("whole").map(|s| s.description()),
            Some("One chunk per document")
        );
    }

    #[test]
    fn test_empty_registry() {
        let registry = StrategyRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.names().is_empty());
    }
}
