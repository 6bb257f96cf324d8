//! Chunking configuration and its validation rules.
//!
//! [`ChunkingConfig`] is deserializable from the `[chunking]` table of the
//! TOML config file. Defaults apply to every omitted key.

use serde::{Deserialize, Serialize};

use crate::error::{ChunkError, Result};

/// Smallest accepted `chunk_size`, in characters.
pub const MIN_CHUNK_SIZE: usize = 50;
/// Largest accepted `chunk_size`, in characters.
pub const MAX_CHUNK_SIZE: usize = 10_000;

/// Strategy key for [`StructureAwareChunker`](crate::structure::StructureAwareChunker).
pub const METHOD_STRUCTURE: &str = "structure";
/// Strategy key for [`FixedSizeChunker`](crate::fixed::FixedSizeChunker).
pub const METHOD_FIXED: &str = "fixed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters shared between adjacent fixed-size windows.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    /// Registry key of the strategy to run (`structure` or `fixed`).
    ///
    /// Kept as a string: whether a method exists is decided by the
    /// engine's registry, not by this type.
    #[serde(default = "default_method")]
    pub method: String,
    /// Headers start a new chunk in structure mode; atomic elements are
    /// never cut by a window end in fixed mode.
    #[serde(default = "default_respect_boundaries")]
    pub respect_boundaries: bool,
    /// Accepted for forward compatibility. Not enforced.
    #[serde(default)]
    pub max_tokens: Option<usize>,
}

fn default_chunk_size() -> usize {
    1000
}
fn default_overlap() -> usize {
    200
}
fn default_method() -> String {
    METHOD_STRUCTURE.to_string()
}
fn default_respect_boundaries() -> bool {
    true
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
            method: default_method(),
            respect_boundaries: default_respect_boundaries(),
            max_tokens: None,
        }
    }
}

impl ChunkingConfig {
    /// Build a validated config with default `respect_boundaries` and no
    /// `max_tokens`.
    ///
    /// ```rust
    /// use mdchunk_core::config::ChunkingConfig;
    ///
    /// assert!(ChunkingConfig::new(1000, 200, "fixed").is_ok());
    /// assert!(ChunkingConfig::new(1000, 1200, "fixed").is_err());
    /// ```
    pub fn new(chunk_size: usize, overlap: usize, method: impl Into<String>) -> Result<Self> {
        let config = Self {
            chunk_size,
            overlap,
            method: method.into(),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_respect_boundaries(mut self, respect_boundaries: bool) -> Self {
        self.respect_boundaries = respect_boundaries;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<usize>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Check the numeric invariants.
    ///
    /// `method` is not checked here; an unregistered method is reported by
    /// the engine as [`ChunkError::UnknownStrategy`].
    pub fn validate(&self) -> Result<()> {
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&self.chunk_size) {
            return Err(ChunkError::InvalidConfig(format!(
                "chunk_size must be in [{}, {}], got {}",
                MIN_CHUNK_SIZE, MAX_CHUNK_SIZE, self.chunk_size
            )));
        }
        if self.overlap >= self.chunk_size {
            return Err(ChunkError::InvalidConfig(format!(
                "overlap ({}) must be less than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        if self.method.trim().is_empty() {
            return Err(ChunkError::InvalidConfig(
                "method must not be empty".to_string(),
            ));
        }
        if self.max_tokens == Some(0) {
            return Err(ChunkError::InvalidConfig(
                "max_tokens must be > 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}
