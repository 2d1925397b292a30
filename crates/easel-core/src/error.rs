//! Error types for name validation.

use thiserror::Error;

use crate::MAX_NAME_CHARS;

/// Why a username or room name was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// Empty or whitespace-only input
    #[error("name must not be empty")]
    Empty,

    /// More than [`MAX_NAME_CHARS`] characters
    #[error("name is {len} characters, the limit is {MAX_NAME_CHARS}")]
    TooLong {
        /// Character count of the rejected input
        len: usize,
    },

    /// Contains a control character (newline, tab, escape, ...)
    #[error("name contains a control character")]
    ControlCharacter,
}
