use crate::violation::Violation;
use fleurmod_common::CommonError;
use fleurmod_xml::XmlError;
use thiserror::Error;

pub type SchemaResult<T> = Result<T, SchemaError>;

/// Failure to load a schema definition
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to read schema: {0}")]
    Read(#[from] CommonError),

    #[error("Failed to parse schema: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid schema: {0}")]
    Invalid(String),

    #[error("Schema cache lock poisoned")]
    CachePoisoned,
}

/// A document does not conform to its schema
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", summarize(.violations))]
pub struct SchemaValidationError {
    pub violations: Vec<Violation>,
}

fn summarize(violations: &[Violation]) -> String {
    match violations {
        [] => "Document does not conform to the schema".to_string(),
        [only] => format!("Schema violation: {}", only),
        [first, rest @ ..] => format!(
            "{} schema violations, first: {} (and {} more)",
            violations.len(),
            first,
            rest.len()
        ),
    }
}

#[derive(Error, Debug)]
pub enum IncludeError {
    #[error("Include at {element} has no href attribute")]
    MissingHref { element: String },

    #[error("Included file not found: {href}")]
    MissingTarget { href: String },

    #[error("Include cycle through {href}")]
    Cycle { href: String },

    #[error("Unsupported xpointer '{pointer}' in include of {href}")]
    InvalidPointer { href: String, pointer: String },

    #[error("Failed to read included file: {0}")]
    Read(#[from] CommonError),

    #[error(transparent)]
    Xml(#[from] XmlError),
}
