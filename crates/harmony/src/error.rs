//! Error taxonomy shared by construction, parsing and search.

use thiserror::Error;

/// Errors from building or searching tonal structures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Input text matched no known name, alias or grammar rule.
    #[error("cannot parse '{fragment}' in '{input}'")]
    Parse { input: String, fragment: String },

    #[error("{value} semitones cannot be spelled as degree {degree}")]
    InvalidInterval { value: i32, degree: i32 },

    /// Duplicate or contradictory degrees, or a failed modifier verify.
    #[error("invalid factors: {0}")]
    InvalidFactor(String),

    #[error("bass {bass} is not in {chord} and cannot be added below it")]
    AmbiguousInversion { chord: String, bass: String },

    #[error("{size} notes exceeds the exact search limit of {limit}")]
    SearchSize { size: usize, limit: usize },

    #[error("search cancelled")]
    Cancelled,

    /// Bootstrap consistency violation in the built-in vocabulary.
    #[error("registry conflict: {0}")]
    Registry(String),
}

impl Error {
    pub fn parse(input: impl Into<String>, fragment: impl Into<String>) -> Self {
        Error::Parse {
            input: input.into(),
            fragment: fragment.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
