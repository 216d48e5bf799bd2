//! Build property overrides (`--build-property`, `--build-properties`).

mod merge;
mod tokenizer;

pub use merge::{
    DEPRECATION_NOTICE, MergedProperties, PropertyOverride, PropertySource, PropertyTable, merge,
};
pub use tokenizer::{PropertyForm, Token, tokenize};

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PropertyError {
    #[error("invalid build property '{input}': unbalanced double quotes")]
    UnbalancedQuote { input: String },

    #[error("invalid build property '{input}': incomplete escape sequence")]
    IncompleteEscape { input: String },

    #[error("invalid build property '{input}': missing '=' separator")]
    MissingSeparator { input: String },

    #[error("invalid build property key '{key}'")]
    InvalidKey { key: String },

    #[error(
        "--build-property accepts a single key=value pair, got '{input}'. Repeat the flag for each property"
    )]
    MultiplePairs { input: String },

    #[error("build property '{key}' is set twice in --build-properties occurrence #{occurrence}")]
    DuplicateKey { key: String, occurrence: usize },
}

impl PropertyError {
    /// Rejected for ambiguity rather than bad syntax.
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            PropertyError::MultiplePairs { .. } | PropertyError::DuplicateKey { .. }
        )
    }
}
