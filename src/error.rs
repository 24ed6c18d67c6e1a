// src/error.rs
use overprint_composer::ComposerError;
use overprint_traits::ResourceError;
use thiserror::Error;

/// Everything that can make a `build` call fail.
///
/// None of these are retried inside the engine; the caller decides what to do.
#[derive(Error, Debug)]
pub enum OverprintError {
    #[error("layout config not found for template '{template_id}' (tried {tried:?})")]
    ConfigNotFound {
        template_id: String,
        tried: Vec<String>,
    },

    #[error("layout config is invalid at '{path}': {message}")]
    ConfigInvalid { path: String, message: String },

    #[error("font not found: {0}")]
    FontNotFound(String),

    #[error("font could not be parsed: {0}")]
    FontInvalid(String),

    #[error("template PDF not found: {0}")]
    TemplateNotFound(String),

    #[error("invalid order data: {0}")]
    OrderData(#[from] serde_json::Error),

    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("composition failed: {0}")]
    Compose(#[from] ComposerError),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OverprintError {
    pub(crate) fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        OverprintError::ConfigInvalid {
            path: path.into(),
            message: message.into(),
        }
    }
}
