use thiserror::Error;

/// Errors raised at the configuration and engine boundaries.
///
/// Extraction and validation never produce these; the pipeline folds every
/// engine-side failure into an empty, zero-confidence result.
#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("malformed data URL: {0}")]
    DataUrl(String),

    #[error("recognition engine {engine} failed: {message}")]
    Engine { engine: String, message: String },

    #[error("recognition engine {0} is not compiled into this build")]
    EngineUnavailable(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unknown mission {0}")]
    UnknownMission(u8),
}

impl ReceiptError {
    pub(crate) fn engine(engine: &str, message: impl std::fmt::Display) -> Self {
        ReceiptError::Engine {
            engine: engine.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T, E = ReceiptError> = std::result::Result<T, E>;
