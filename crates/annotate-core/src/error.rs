use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Document capture failed: {0}")]
    Capture(String),

    #[error("Image encoding failed: {0}")]
    Encode(String),

    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
