//! Error types for the modifier

use crate::store::StoreError;
use fleurmod_common::CommonError;
use fleurmod_schema::{IncludeError, SchemaError, SchemaValidationError};
use fleurmod_xml::XmlError;
use thiserror::Error;

/// Failure of a single task, at record time or at apply time
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Path '{path}' matched {count} nodes, expected exactly one")]
    AmbiguousMatch { path: String, count: usize },

    #[error("Malformed task: {0}")]
    MalformedTask(String),

    #[error("Attribute '{attribute}' has non-numeric value '{value}'")]
    NotANumber { attribute: String, value: String },

    #[error("XML error: {0}")]
    Xml(#[from] XmlError),
}

impl TaskError {
    pub fn malformed(message: impl Into<String>) -> Self {
        TaskError::MalformedTask(message.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        TaskError::PathNotFound(path.into())
    }
}

#[derive(Error, Debug)]
pub enum ModifierError {
    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Schema validation failed: {0}")]
    SchemaValidation(#[from] SchemaValidationError),

    #[error("No schema available for validation")]
    SchemaUnavailable,

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Include error: {0}")]
    Include(#[from] IncludeError),

    #[error("XML error: {0}")]
    Xml(#[from] XmlError),

    #[error("File error: {0}")]
    File(#[from] CommonError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ModifierResult<T> = Result<T, ModifierError>;
