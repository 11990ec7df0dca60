use fleurmod_xml::XmlError;
use thiserror::Error;

/// Failure to load a file through a [`FileSystem`](crate::FileSystem)
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("XML error: {0}")]
    Xml(#[from] XmlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    NotFound(String),

    /// Backend-specific failure (read-only views, poisoned locks)
    #[error("{0}")]
    Generic(String),
}
