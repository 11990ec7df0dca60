//! # Fleur Input Schema
//!
//! Declarative structure rules for Fleur input documents and the
//! validator that checks a [`Document`](fleurmod_xml::Document) against
//! them. Schemas are JSON files (see `schemas/`), loaded once and shared
//! read-only through [`SchemaCache`].
//!
//! Input files may pull in other files with XInclude directives; the
//! [`IncludeResolver`] expands those on a copy before validation.

pub mod cache;
pub mod error;
pub mod include;
pub mod schema;
pub mod validator;
pub mod violation;

pub use cache::SchemaCache;
pub use error::{IncludeError, SchemaError, SchemaResult, SchemaValidationError};
pub use include::{include_targets, IncludeResolver, XINCLUDE_NAMESPACE};
pub use schema::{AttributeRule, ChildRule, ElementRule, Schema, ValueType};
pub use validator::validate;
pub use violation::Violation;
