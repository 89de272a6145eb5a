//! Normalization of informal Persian text for downstream NLP.
//!
//! ```
//! use persian_normalizer::Normalizer;
//!
//! let normalizer = Normalizer::default();
//! assert_eq!(normalizer.normalize_word("TEST!"), "test");
//! assert_eq!(normalizer.normalize_sentence("میدونم"), "می\u{200c}دونم");
//! ```

pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod normalize;
pub mod rules;

pub use batch::{BatchRunner, CancelFlag};
pub use cache::{CacheStats, WordCache};
pub use config::NormalizerConfig;
pub use error::{NormalizeError, Result};
pub use normalize::Normalizer;
pub use rules::NormalizationRules;
