use thiserror::Error;

use crate::config::ConfigKey;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced by [`crate::TextDocument`] edits.
pub enum DocumentError {
    #[error("invalid position {line}:{column}")]
    /// The position lies outside the document.
    InvalidPosition {
        /// Document line.
        line: usize,
        /// Column in characters.
        column: usize,
    },

    #[error("invalid range {start_line}:{start_column}..{end_line}:{end_column}")]
    /// The range is reversed or reaches outside the document.
    InvalidRange {
        /// Start line.
        start_line: usize,
        /// Start column.
        start_column: usize,
        /// End line.
        end_line: usize,
        /// End column.
        end_column: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced when writing configuration values.
pub enum ConfigError {
    #[error("invalid value for {key:?}: {reason}")]
    /// The value is outside the accepted domain for the key.
    InvalidValue {
        /// The key being written.
        key: ConfigKey,
        /// Human readable explanation.
        reason: &'static str,
    },

    #[error("type mismatch for {key:?}: expected {expected}")]
    /// A [`crate::ConfigValue`] of the wrong kind was supplied for the key.
    TypeMismatch {
        /// The key being written.
        key: ConfigKey,
        /// Expected value kind.
        expected: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced by [`crate::FoldingManager`].
pub enum FoldingError {
    #[error("invalid fold region {start_line}..={end_line} for {line_count} lines")]
    /// A fold must span at least two lines inside the document.
    InvalidRegion {
        /// First line of the region (stays visible).
        start_line: usize,
        /// Last line of the region (inclusive).
        end_line: usize,
        /// Document line count at the time of the call.
        line_count: usize,
    },
}
