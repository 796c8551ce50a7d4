// Typed errors with thiserror. Every variant aborts the whole resolution pass.
// Messages are surfaced verbatim to JS, so they name the offending frame or value.

use thiserror::Error;

/// Resolution error types.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Unknown frame id '{0}': not present in the structure's frames")]
    UnknownFrame(String),

    #[error("Frame '{0}' has no kind")]
    MissingKind(String),

    #[error("Frame '{frame_id}' has unknown kind '{kind}'")]
    UnknownKind { frame_id: String, kind: String },

    #[error("Frame '{frame_id}' uses unknown sampler '{sampler}'")]
    UnknownSampler { frame_id: String, sampler: String },

    #[error("Invalid configuration for frame '{frame_id}': {message}")]
    InvalidNode { frame_id: String, message: String },

    #[error("Frame '{frame_id}': frameIndex {index} is out of range for {len} frame options")]
    FrameIndexOutOfRange {
        frame_id: String,
        index: i64,
        len: usize,
    },

    #[error("Unrecognized selector '{selector}' in '{value}'")]
    UnrecognizedSelector { value: String, selector: String },

    #[error("Selector syntax used in '{value}' but no replacement named '{name}' is defined")]
    UnknownSelectorTarget { value: String, name: String },

    #[error("Selector syntax used in '{value}' but value of '{name}' is not a list")]
    SelectorOnNonList { value: String, name: String },

    #[error("Selector index {index} in '{value}' is out of range for a list of length {len}")]
    SelectorIndexOutOfRange { value: String, index: i64, len: usize },

    #[error(
        "Frame '{frame_id}': invalid conditionForAdditionalSessions '{value}' \
         (expected 'random', 'persist' or 'rotate')"
    )]
    InvalidConditionPolicy { frame_id: String, value: String },

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error(
        "Asset path '{0}': nesting of properties to expand more than one level deep is not supported"
    )]
    UnsupportedAssetPath(String),

    #[error("Failed to resolve dependency '{url}': {message}")]
    Dependency { url: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ResolveError {
    fn from(err: serde_json::Error) -> Self {
        ResolveError::Serialization(err.to_string())
    }
}
