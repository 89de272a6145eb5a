//! Options for building a [`Normalizer`](crate::Normalizer) and
//! [`BatchRunner`](crate::BatchRunner).

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::error::{NormalizeError, Result};
use crate::rules::{
    NormalizationRules, DEFAULT_PREFIXES, DEFAULT_REPEAT_THRESHOLD, DEFAULT_SUFFIXES,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_PARALLEL_THRESHOLD: usize = 100;

/// Every field is optional in a JSON options file; missing ones take the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Entries kept in the word cache. Default: 32768. Zero disables caching.
    pub cache_capacity: usize,

    /// Runs of this many identical characters or more collapse to one fewer.
    /// Default: 3 (so "سلاممممم" becomes "سلامم"). Must be at least 2.
    pub repeat_threshold: usize,

    /// Batches smaller than this run on the calling thread. Default: 100.
    pub parallel_threshold: usize,

    /// Worker threads for large batches. Default: 0, one per logical CPU.
    pub workers: usize,

    /// Bound prefixes joined to the rest of their word with a half-space.
    pub prefixes: Vec<String>,

    /// Bound suffixes merged into the preceding word with a half-space.
    pub suffixes: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            repeat_threshold: DEFAULT_REPEAT_THRESHOLD,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            workers: 0,
            prefixes: DEFAULT_PREFIXES.iter().map(|s| s.to_string()).collect(),
            suffixes: DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl NormalizerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: NormalizerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        info!("loaded normalizer options from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.repeat_threshold < 2 {
            return Err(NormalizeError::Config(format!(
                "repeat_threshold must be at least 2, got {}",
                self.repeat_threshold
            )));
        }
        if self.parallel_threshold == 0 {
            return Err(NormalizeError::Config(
                "parallel_threshold must be at least 1".to_string(),
            ));
        }
        if let Some(bad) = self.suffixes.iter().find(|s| s.chars().any(char::is_whitespace)) {
            return Err(NormalizeError::Config(format!("suffix {bad:?} contains whitespace")));
        }
        if let Some(bad) = self.prefixes.iter().find(|s| s.chars().any(char::is_whitespace)) {
            return Err(NormalizeError::Config(format!("prefix {bad:?} contains whitespace")));
        }
        Ok(())
    }

    /// Worker count with the "auto" default resolved.
    pub fn resolved_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.workers
        }
    }

    pub fn build_rules(&self) -> NormalizationRules {
        NormalizationRules::new(
            self.repeat_threshold,
            self.prefixes.clone(),
            self.suffixes.clone(),
        )
    }
}
