use thiserror::Error;

pub type XmlResult<T> = Result<T, XmlError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum XmlError {
    #[error("Malformed XML: {message}")]
    Parse { message: String },

    #[error("Invalid path expression '{path}' at {pos}: {message}")]
    PathSyntax {
        path: String,
        pos: usize,
        message: String,
    },

    #[error("Invalid XML name: '{0}'")]
    InvalidName(String),

    #[error("Document has no root element")]
    MissingRoot,
}

impl XmlError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn path_syntax(path: impl Into<String>, pos: usize, message: impl Into<String>) -> Self {
        Self::PathSyntax {
            path: path.into(),
            pos,
            message: message.into(),
        }
    }
}
