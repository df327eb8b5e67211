use thiserror::Error;

/// Startup failures while reading settings from the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// Why a completion could not be turned into a specification.
///
/// These are returned as data inside [`crate::rag::Generation::Failed`] so the
/// caller can retry with a different prompt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("generated text is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("generated specification is not a JSON object")]
    NotAnObject,

    #[error("generated specification is missing required sections: {}", .0.join(", "))]
    MissingSections(Vec<String>),

    #[error("generated specification is missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
}
