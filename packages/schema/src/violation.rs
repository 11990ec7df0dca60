use serde::{Deserialize, Serialize};
use std::fmt;

/// One way in which a document breaks its schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Location of the offending element, e.g. `/fleurInput/atomSpecies/species[2]`
    pub path: String,

    /// The check that failed
    pub rule: String,

    /// Human-readable message
    pub message: String,
}

impl Violation {
    pub fn new(
        path: impl Into<String>,
        rule: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            rule: rule.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.path, self.message, self.rule)
    }
}
