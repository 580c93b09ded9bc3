use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommonError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive error: {0}")]
    Archive(String),
    #[error("unsupported compression for {0}")]
    UnsupportedCompression(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("unsupported url: {0}")]
    UnsupportedUrl(String),
}
