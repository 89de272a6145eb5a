//! Error types for the normalizer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NormalizeError {
    /// Raw input was not text. `index` is the position in a batch, if any.
    #[error("invalid input{}: {reason}", at_index(.index))]
    InvalidInput {
        index: Option<usize>,
        reason: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("could not build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

fn at_index(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!(" at index {i}"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, NormalizeError>;

impl NormalizeError {
    pub(crate) fn invalid_utf8(index: Option<usize>, err: std::str::Utf8Error) -> Self {
        NormalizeError::InvalidInput {
            index,
            reason: format!("not valid UTF-8 text ({err})"),
        }
    }
}
