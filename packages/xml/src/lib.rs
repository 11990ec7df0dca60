//! # Fleur XML
//!
//! Editable XML documents for Fleur input files: an arena element tree,
//! a deterministic serializer, a path expression engine for addressing
//! elements, and content checksums.

pub mod checksum;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod serializer;
pub mod tree;
pub mod xpath;

pub use checksum::{checksum, document_checksum};
pub use error::{XmlError, XmlResult};
pub use parser::{parse, parse_fragment};
pub use serializer::{serialize, Serializer};
pub use tree::{validate_name, Attribute, Document, Fragment, NodeId};
pub use xpath::{quote_literal, CreationPlan, XPath};
