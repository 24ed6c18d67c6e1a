use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposerError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("template document has no pages")]
    EmptyTemplate,

    #[error("overlay document has no pages")]
    EmptyOverlay,

    #[error("template document is encrypted")]
    Encrypted,
}
