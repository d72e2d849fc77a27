//! Error handling for neuralfx
//!
//! Load failures are kept apart from the general error type: a `LoadError`
//! never crosses into the per-block path, it only decides whether the
//! processor comes up with a model or in the unloaded state.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for neuralfx operations
pub type Result<T> = std::result::Result<T, NeuralFxError>;

/// Reasons a model document can fail to load
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Unable to read model file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed model document {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Model document has no layers")]
    EmptyLayers,

    #[error("Values for in_skip other than 0 or 1 are not supported (got {value})")]
    UnsupportedSkip { value: i64 },

    #[error("Unsupported input arity {arity} (expected 1, 2 or 3)")]
    UnsupportedArity { arity: usize },

    #[error("Unsupported layer type '{layer_type}' at layer {index}")]
    UnsupportedLayer { index: usize, layer_type: String },

    #[error("Shape mismatch at layer {index}: expected {expected} inputs, found {found}")]
    ShapeMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid weights for layer {index}: {reason}")]
    InvalidWeights { index: usize, reason: String },

    #[error("Sample rate {sample_rate} is not a finite positive number")]
    InvalidSampleRate { sample_rate: f64 },
}

impl LoadError {
    /// Get the error code for this load failure
    pub fn error_code(&self) -> &'static str {
        match self {
            LoadError::Io { .. } => "MODEL_IO",
            LoadError::Parse { .. } => "MODEL_PARSE",
            LoadError::MissingField { .. } => "MISSING_FIELD",
            LoadError::InvalidField { .. } => "INVALID_FIELD",
            LoadError::EmptyLayers => "EMPTY_LAYERS",
            LoadError::UnsupportedSkip { .. } => "UNSUPPORTED_SKIP",
            LoadError::UnsupportedArity { .. } => "UNSUPPORTED_ARITY",
            LoadError::UnsupportedLayer { .. } => "UNSUPPORTED_LAYER",
            LoadError::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            LoadError::InvalidWeights { .. } => "INVALID_WEIGHTS",
            LoadError::InvalidSampleRate { .. } => "INVALID_SAMPLE_RATE",
        }
    }

    /// Get recovery suggestions for this load failure
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            LoadError::UnsupportedSkip { .. } => vec![
                "Re-export the model with in_skip set to 0 or 1",
                "Remove in_skip to disable the input skip connection",
            ],
            LoadError::UnsupportedArity { .. } => vec![
                "Only models with 1, 2 or 3 inputs per sample are supported",
                "Check the last element of in_shape",
            ],
            LoadError::InvalidSampleRate { .. } => {
                vec!["Pass the host sample rate in Hz, e.g. 44100 or 48000"]
            }
            _ => vec![
                "Check that the model file exists in the bundle directory",
                "Validate the document with 'neuralfx-cli inspect <file>'",
            ],
        }
    }

    pub(crate) fn missing(field: impl Into<String>) -> Self {
        LoadError::MissingField {
            field: field.into(),
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        LoadError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Main error type for neuralfx operations
#[derive(Error, Debug)]
pub enum NeuralFxError {
    #[error("Model load failed: {0}")]
    Load(#[from] LoadError),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NeuralFxError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            NeuralFxError::Load(inner) => inner.error_code(),
            NeuralFxError::FileNotFound { .. } => "FILE_NOT_FOUND",
            NeuralFxError::InvalidAudio { .. } => "INVALID_AUDIO",
            NeuralFxError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            NeuralFxError::InvalidConfig { .. } => "INVALID_CONFIG",
            NeuralFxError::Io(_) => "IO_ERROR",
            NeuralFxError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            NeuralFxError::Load(_)
                | NeuralFxError::FileNotFound { .. }
                | NeuralFxError::InvalidAudio { .. }
                | NeuralFxError::UnsupportedFormat { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            NeuralFxError::Load(inner) => inner.recovery_suggestions(),
            NeuralFxError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Verify the file hasn't been moved or deleted",
            ],
            NeuralFxError::UnsupportedFormat { .. } => vec![
                "Convert the file to a mono WAV first",
                "Resample to the rate the model was trained at",
            ],
            _ => vec![],
        }
    }
}
