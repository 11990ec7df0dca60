use crate::error::{SchemaError, SchemaResult};
use fleurmod_common::FileSystem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const BUNDLED_FLEUR_INPUT: &str = include_str!("../schemas/fleur_input_0.31.json");

/// Structure rules for one input format version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub version: String,

    /// Required name of the root element
    pub root: String,

    /// Rules by element name
    pub elements: BTreeMap<String, ElementRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRule {
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeRule>,

    /// Allowed children; listed order is the required order when `ordered`
    #[serde(default)]
    pub children: Vec<ChildRule>,

    /// Type of the text content, `None` if the element takes no text
    #[serde(default)]
    pub text: Option<ValueType>,

    #[serde(default)]
    pub ordered: bool,

    /// Accept attributes, children and text not listed here
    #[serde(default)]
    pub open: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeRule {
    #[serde(rename = "type")]
    pub value_type: ValueType,

    #[serde(default)]
    pub required: bool,

    /// Allowed values for `enum` attributes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRule {
    pub name: String,

    #[serde(default)]
    pub min: u32,

    /// Upper bound, unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    String,
    Integer,
    NonNegativeInteger,
    PositiveInteger,
    Float,
    FleurBool,
    Enum,
}

impl ValueType {
    /// Check a value against this type; `values` is used for `Enum`
    pub fn accepts(self, value: &str, values: &[String]) -> bool {
        let trimmed = value.trim();
        match self {
            ValueType::String => true,
            ValueType::Integer => trimmed.parse::<i64>().is_ok(),
            ValueType::NonNegativeInteger => trimmed.parse::<u64>().is_ok(),
            ValueType::PositiveInteger => trimmed.parse::<u64>().map(|v| v > 0).unwrap_or(false),
            ValueType::Float => trimmed.parse::<f64>().is_ok(),
            ValueType::FleurBool => matches!(
                trimmed.to_ascii_lowercase().as_str(),
                "t" | "f" | "true" | "false"
            ),
            ValueType::Enum => values.iter().any(|v| v == trimmed),
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            ValueType::String => "a string",
            ValueType::Integer => "an integer",
            ValueType::NonNegativeInteger => "a non-negative integer",
            ValueType::PositiveInteger => "a positive integer",
            ValueType::Float => "a number",
            ValueType::FleurBool => "a Fleur boolean (T/F)",
            ValueType::Enum => "one of the allowed values",
        }
    }
}

impl Schema {
    pub fn from_json(source: &str) -> SchemaResult<Self> {
        let schema: Schema = serde_json::from_str(source)?;
        schema.check()?;
        Ok(schema)
    }

    pub fn load(fs: &dyn FileSystem, path: &Path) -> SchemaResult<Self> {
        let source = fs.read_to_string(path)?;
        tracing::debug!(path = %path.display(), "Loading schema");
        Self::from_json(&source)
    }

    /// Schema for Fleur input version 0.31 shipped with this crate
    pub fn bundled() -> SchemaResult<Self> {
        Self::from_json(BUNDLED_FLEUR_INPUT)
    }

    pub fn element(&self, name: &str) -> Option<&ElementRule> {
        self.elements.get(name)
    }

    /// Internal consistency: the root has a rule and enum attributes list values
    fn check(&self) -> SchemaResult<()> {
        if !self.elements.contains_key(&self.root) {
            return Err(SchemaError::Invalid(format!(
                "root element '{}' has no rule",
                self.root
            )));
        }

        for (element, rule) in &self.elements {
            for (attribute, attr_rule) in &rule.attributes {
                if attr_rule.value_type == ValueType::Enum && attr_rule.values.is_empty() {
                    return Err(SchemaError::Invalid(format!(
                        "enum attribute '{}' of '{}' lists no values",
                        attribute, element
                    )));
                }
            }
            for child in &rule.children {
                if child.max.map(|max| max < child.min).unwrap_or(false) {
                    return Err(SchemaError::Invalid(format!(
                        "child '{}' of '{}' has max below min",
                        child.name, element
                    )));
                }
            }
        }

        Ok(())
    }
}

impl ElementRule {
    pub fn child(&self, name: &str) -> Option<(usize, &ChildRule)> {
        self.children
            .iter()
            .enumerate()
            .find(|(_, child)| child.name == name)
    }
}
