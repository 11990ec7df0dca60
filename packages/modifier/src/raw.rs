//! # Task Wire Format
//!
//! A persisted task is a JSON array `[name, positional..., {kwargs}]`:
//!
//! ```text
//! ["xml_set_first_attribv", "/a", "x", "2"]
//! ["set_inpchanges", {"change_dict": {"itmax": 1}}]
//! ["set_inpchanges", {"itmax": 1}]
//! ```
//!
//! A trailing object counts as keyword arguments only if every key is a
//! parameter name of the operation; otherwise it is the last positional
//! argument (the second and third lines above mean the same thing). That
//! decision needs the operation's signature, so it happens when binding
//! (see [`OperationRegistry::bind`](crate::OperationRegistry::bind)).
//!
//! Tasks written by this crate always use the canonical form
//! `[name, {every parameter}]`.

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// A task as stored: operation name plus unbound arguments
#[derive(Debug, Clone, PartialEq)]
pub struct RawTask {
    pub name: String,
    pub args: Vec<Value>,
}

impl RawTask {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// `(name, {kwargs})`, the shape used by workflow change lists
    pub fn with_kwargs(name: impl Into<String>, kwargs: Map<String, Value>) -> Self {
        Self::new(name, vec![Value::Object(kwargs)])
    }
}

impl Serialize for RawTask {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.args.len() + 1))?;
        seq.serialize_element(&self.name)?;
        for arg in &self.args {
            seq.serialize_element(arg)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for RawTask {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RawTaskVisitor;

        impl<'de> Visitor<'de> for RawTaskVisitor {
            type Value = RawTask;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an array starting with an operation name")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<RawTask, A::Error> {
                let name: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;

                let mut args = Vec::new();
                while let Some(arg) = seq.next_element::<Value>()? {
                    args.push(arg);
                }

                Ok(RawTask { name, args })
            }
        }

        deserializer.deserialize_seq(RawTaskVisitor)
    }
}
