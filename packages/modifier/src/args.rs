//! Argument binding: wire values → named, typed parameters

use crate::errors::TaskError;
use crate::registry::OperationSpec;
use crate::raw::RawTask;
use fleurmod_xml::{validate_name, Fragment, XPath};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Arguments of one task, keyed by parameter name
pub(crate) struct Args<'a> {
    operation: &'a str,
    values: BTreeMap<&'static str, Value>,
}

impl<'a> Args<'a> {
    /// Bind a wire task, treating a non-empty trailing object as kwargs
    /// when every key names a parameter
    pub fn from_raw(spec: &'a OperationSpec, raw: &RawTask) -> Result<Self, TaskError> {
        match raw.args.split_last() {
            Some((Value::Object(map), rest))
                if !map.is_empty() && map.keys().all(|k| spec.params.contains(&k.as_str())) =>
            {
                Self::bind(spec, rest, Some(map))
            }
            _ => Self::bind(spec, &raw.args, None),
        }
    }

    pub fn bind(
        spec: &'a OperationSpec,
        positional: &[Value],
        kwargs: Option<&Map<String, Value>>,
    ) -> Result<Self, TaskError> {
        if positional.len() > spec.params.len() {
            return Err(TaskError::malformed(format!(
                "{} takes at most {} arguments, got {}",
                spec.name,
                spec.params.len(),
                positional.len()
            )));
        }

        let mut values = BTreeMap::new();
        for (param, value) in spec.params.iter().zip(positional) {
            values.insert(*param, value.clone());
        }

        for (key, value) in kwargs.into_iter().flatten() {
            let param = spec
                .params
                .iter()
                .find(|p| **p == key.as_str())
                .ok_or_else(|| {
                    TaskError::malformed(format!(
                        "{} got an unexpected keyword argument '{}'",
                        spec.name, key
                    ))
                })?;
            if values.insert(*param, value.clone()).is_some() {
                return Err(TaskError::malformed(format!(
                    "{} got multiple values for argument '{}'",
                    spec.name, key
                )));
            }
        }

        let args = Self {
            operation: spec.name,
            values,
        };
        for param in &spec.params[..spec.required] {
            args.require(param)?;
        }
        Ok(args)
    }

    fn error(&self, param: &str, expected: &str) -> TaskError {
        TaskError::malformed(format!(
            "{}: argument '{}' must be {}",
            self.operation, param, expected
        ))
    }

    /// Present and not null
    pub fn get(&self, param: &str) -> Option<&Value> {
        self.values.get(param).filter(|v| !v.is_null())
    }

    fn require(&self, param: &str) -> Result<&Value, TaskError> {
        self.get(param).ok_or_else(|| {
            TaskError::malformed(format!(
                "{} missing required argument '{}'",
                self.operation, param
            ))
        })
    }

    pub fn string(&self, param: &str) -> Result<String, TaskError> {
        scalar_string(self.require(param)?).ok_or_else(|| self.error(param, "a string or number"))
    }

    pub fn optional_string(&self, param: &str) -> Result<Option<String>, TaskError> {
        match self.get(param) {
            None => Ok(None),
            Some(value) => scalar_string(value)
                .map(Some)
                .ok_or_else(|| self.error(param, "a string or number")),
        }
    }

    /// A string that is a valid attribute name
    pub fn attribute_name(&self, param: &str) -> Result<String, TaskError> {
        let name = self.string(param)?;
        check_attribute_name(&name)?;
        Ok(name)
    }

    pub fn xpath(&self, param: &str) -> Result<XPath, TaskError> {
        let source = self.string(param)?;
        XPath::parse(&source).map_err(|e| {
            TaskError::malformed(format!("{}: argument '{}': {}", self.operation, param, e))
        })
    }

    pub fn fragment(&self, param: &str) -> Result<Fragment, TaskError> {
        let source = self.string(param)?;
        Fragment::parse(&source).map_err(|e| {
            TaskError::malformed(format!("{}: argument '{}': {}", self.operation, param, e))
        })
    }

    pub fn bool_or(&self, param: &str, default: bool) -> Result<bool, TaskError> {
        match self.get(param) {
            None => Ok(default),
            Some(value) => fleur_bool(value).ok_or_else(|| self.error(param, "a boolean")),
        }
    }

    pub fn number(&self, param: &str) -> Result<f64, TaskError> {
        let value = self.require(param)?;
        number(value).ok_or_else(|| self.error(param, "a number"))
    }

    pub fn integer_or(&self, param: &str, default: i64) -> Result<i64, TaskError> {
        match self.get(param) {
            None => Ok(default),
            Some(value) => integer(value).ok_or_else(|| self.error(param, "an integer")),
        }
    }

    /// Occurrence list: a single index or a list of indices, `-1` for all
    pub fn occurrences(&self, param: &str) -> Result<Vec<i64>, TaskError> {
        let occ = match self.get(param) {
            None => vec![0],
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    integer(item).ok_or_else(|| self.error(param, "a list of integers"))
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(value) => {
                vec![integer(value).ok_or_else(|| self.error(param, "an integer list"))?]
            }
        };

        if occ.is_empty() || occ.iter().any(|i| *i < -1) {
            return Err(self.error(param, "a non-empty list of indices >= -1"));
        }
        Ok(occ)
    }

    pub fn object(&self, param: &str) -> Result<Map<String, Value>, TaskError> {
        match self.require(param)? {
            Value::Object(map) => Ok(map.clone()),
            _ => Err(self.error(param, "a mapping")),
        }
    }

    /// A scalar or a list of scalars
    pub fn scalars(&self, param: &str) -> Result<Vec<String>, TaskError> {
        match self.require(param)? {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    scalar_string(item).ok_or_else(|| self.error(param, "a list of scalars"))
                })
                .collect(),
            value => Ok(vec![scalar_string(value).ok_or_else(|| self.error(param, "a scalar"))?]),
        }
    }

    pub fn is_list(&self, param: &str) -> bool {
        matches!(self.get(param), Some(Value::Array(_)))
    }
}

/// Attribute/text form of a scalar: strings verbatim, numbers as written,
/// booleans as Fleur switches
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(switch(*b).to_string()),
        _ => None,
    }
}

/// `NCName` or `prefix:NCName`
pub fn check_attribute_name(name: &str) -> Result<(), TaskError> {
    validate_name(name)
        .map_err(|_| TaskError::malformed(format!("'{}' is not a valid attribute name", name)))
}

pub fn switch(value: bool) -> &'static str {
    if value {
        "T"
    } else {
        "F"
    }
}

pub fn fleur_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "t" | "true" => Some(true),
            "f" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
