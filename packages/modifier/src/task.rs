//! # Tasks
//!
//! One variant per operation of the input modifier, each carrying its
//! validated arguments.
//!
//! ## Semantics
//!
//! ### Matching
//! - "first" variants act on the first match in document order
//! - "all" variants act on every match
//! - occurrence lists are 0-based, `-1` selects every match
//! - a path that matches nothing fails with `PathNotFound`, unless the
//!   task has `create` set and the path can be created
//!   (`delete_tag` and `delete_att` are no-ops instead)
//! - a path selecting the document node (`/`) is malformed, and the root
//!   element can be neither replaced nor deleted
//!
//! ### Attributes
//! - setting an attribute on an existing node always creates it if
//!   missing; `create` only governs missing nodes
//!
//! ### Determinism
//! - applying the same task to equal documents yields equal documents

use crate::args::switch;
use crate::errors::TaskError;
use crate::inpchanges;
use crate::navigate::{
    ensure_nodes, exactly_one, pick_index, pick_occurrences, require_nodes, select_elements,
};
use crate::raw::RawTask;
use crate::species::{self, AtomGroupFilter};
use fleurmod_xml::{Document, Fragment, NodeId, XPath};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

const KPOINT_SETS: &str = "/fleurInput/calculationSetup/bzIntegration/kPointList \
                           | /fleurInput/calculationSetup/bzIntegration/kPointCount";

/// One value for every node, or one value per node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValues {
    Single(String),
    PerNode(Vec<String>),
}

impl NodeValues {
    fn for_nodes(&self, count: usize, path: &XPath) -> Result<Vec<&str>, TaskError> {
        match self {
            NodeValues::Single(value) => Ok(vec![value.as_str(); count]),
            NodeValues::PerNode(values) if values.len() == count => {
                Ok(values.iter().map(String::as_str).collect())
            }
            NodeValues::PerNode(values) => Err(TaskError::malformed(format!(
                "{} values given for {} nodes matched by '{}'",
                values.len(),
                count,
                path
            ))),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            NodeValues::Single(value) => json!(value),
            NodeValues::PerNode(values) => json!(values),
        }
    }
}

/// How `add_num_to_att` combines the stored and the given number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumMode {
    /// Add to the current value
    Abs,
    /// Set exactly to the given value
    Rel,
    /// Multiply the current value
    Mul,
}

impl NumMode {
    pub fn parse(mode: &str) -> Option<Self> {
        match mode {
            "abs" => Some(NumMode::Abs),
            "rel" => Some(NumMode::Rel),
            "mul" => Some(NumMode::Mul),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NumMode::Abs => "abs",
            NumMode::Rel => "rel",
            NumMode::Mul => "mul",
        }
    }
}

/// A recorded edit with bound arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    /// `xml_set_attribv_occ`
    SetAttribOcc {
        xpath: XPath,
        attribute: String,
        value: String,
        occurrences: Vec<i64>,
        create: bool,
    },

    /// `xml_set_first_attribv`
    SetFirstAttrib {
        xpath: XPath,
        attribute: String,
        value: String,
        create: bool,
    },

    /// `xml_set_all_attribv`
    SetAllAttrib {
        xpath: XPath,
        attribute: String,
        values: NodeValues,
        create: bool,
    },

    /// `xml_set_text`, first match
    SetText {
        xpath: XPath,
        text: String,
        create: bool,
    },

    /// `xml_set_text_occ`, negative occurrences count from the end
    SetTextOcc {
        xpath: XPath,
        text: String,
        create: bool,
        occurrence: i64,
    },

    /// `xml_set_all_text`
    SetAllText {
        xpath: XPath,
        text: NodeValues,
        create: bool,
    },

    /// `create_tag`: append a copy of `element` under every match
    CreateTag {
        xpath: XPath,
        element: Fragment,
        create: bool,
    },

    /// `replace_tag`: replace every match with a copy of `element`
    ReplaceTag { xpath: XPath, element: Fragment },

    /// `delete_tag`
    DeleteTag { xpath: XPath },

    /// `delete_att`
    DeleteAtt { xpath: XPath, attribute: String },

    /// `set_species`
    SetSpecies {
        species: String,
        changes: Map<String, Value>,
        create: bool,
    },

    /// `set_species_label`
    SetSpeciesLabel {
        label: String,
        changes: Map<String, Value>,
        create: bool,
    },

    /// `set_atomgr_att`
    SetAtomGroupAtt {
        changes: Map<String, Value>,
        filter: AtomGroupFilter,
        create: bool,
    },

    /// `set_atomgr_att_label`
    SetAtomGroupAttLabel {
        changes: Map<String, Value>,
        label: String,
        create: bool,
    },

    /// `set_inpchanges`, applied in key order
    SetInpChanges { changes: BTreeMap<String, Value> },

    /// `set_nkpts`: replace the k-point set with a plain count
    SetNkpts { count: u64, gamma: bool },

    /// `add_num_to_att`
    AddNumToAtt {
        xpath: XPath,
        attribute: String,
        value: f64,
        mode: NumMode,
        occurrences: Vec<i64>,
        create: bool,
    },
}

impl Task {
    /// Operation name of this task
    pub fn name(&self) -> &'static str {
        match self {
            Task::SetAttribOcc { .. } => "xml_set_attribv_occ",
            Task::SetFirstAttrib { .. } => "xml_set_first_attribv",
            Task::SetAllAttrib { .. } => "xml_set_all_attribv",
            Task::SetText { .. } => "xml_set_text",
            Task::SetTextOcc { .. } => "xml_set_text_occ",
            Task::SetAllText { .. } => "xml_set_all_text",
            Task::CreateTag { .. } => "create_tag",
            Task::ReplaceTag { .. } => "replace_tag",
            Task::DeleteTag { .. } => "delete_tag",
            Task::DeleteAtt { .. } => "delete_att",
            Task::SetSpecies { .. } => "set_species",
            Task::SetSpeciesLabel { .. } => "set_species_label",
            Task::SetAtomGroupAtt { .. } => "set_atomgr_att",
            Task::SetAtomGroupAttLabel { .. } => "set_atomgr_att_label",
            Task::SetInpChanges { .. } => "set_inpchanges",
            Task::SetNkpts { .. } => "set_nkpts",
            Task::AddNumToAtt { .. } => "add_num_to_att",
        }
    }

    /// Apply the task to a working document
    ///
    /// On error the document may be partially edited; callers work on a
    /// disposable copy.
    pub fn apply(&self, doc: &mut Document) -> Result<(), TaskError> {
        match self {
            Task::SetAttribOcc { xpath, attribute, value, occurrences, create } => {
                let nodes = ensure_nodes(doc, xpath, *create)?;
                for id in pick_occurrences(&nodes, occurrences, xpath)? {
                    doc.set_attribute(id, attribute, value.clone());
                }
                Ok(())
            }

            Task::SetFirstAttrib { xpath, attribute, value, create } => {
                let id = first(&ensure_nodes(doc, xpath, *create)?, xpath)?;
                doc.set_attribute(id, attribute, value.clone());
                Ok(())
            }

            Task::SetAllAttrib { xpath, attribute, values, create } => {
                let nodes = ensure_nodes(doc, xpath, *create)?;
                let values = values.for_nodes(nodes.len(), xpath)?;
                for (id, value) in nodes.into_iter().zip(values) {
                    doc.set_attribute(id, attribute, value);
                }
                Ok(())
            }

            Task::SetText { xpath, text, create } => {
                let id = first(&ensure_nodes(doc, xpath, *create)?, xpath)?;
                doc.set_text(id, Some(text.clone()));
                Ok(())
            }

            Task::SetTextOcc { xpath, text, create, occurrence } => {
                let nodes = ensure_nodes(doc, xpath, *create)?;
                let id = pick_index(&nodes, *occurrence, xpath)?;
                doc.set_text(id, Some(text.clone()));
                Ok(())
            }

            Task::SetAllText { xpath, text, create } => {
                let nodes = ensure_nodes(doc, xpath, *create)?;
                let texts = text.for_nodes(nodes.len(), xpath)?;
                for (id, text) in nodes.into_iter().zip(texts) {
                    doc.set_text(id, Some(text.to_string()));
                }
                Ok(())
            }

            Task::CreateTag { xpath, element, create } => {
                for parent in ensure_nodes(doc, xpath, *create)? {
                    doc.append_fragment(parent, element);
                }
                Ok(())
            }

            Task::ReplaceTag { xpath, element } => Self::apply_replace(doc, xpath, element),

            Task::DeleteTag { xpath } => {
                for id in select_elements(doc, xpath)? {
                    if is_root(doc, id) {
                        return Err(TaskError::malformed(format!(
                            "delete_tag cannot delete the root element ('{}')",
                            xpath
                        )));
                    }
                    doc.detach(id);
                }
                Ok(())
            }

            Task::DeleteAtt { xpath, attribute } => {
                for id in select_elements(doc, xpath)? {
                    doc.remove_attribute(id, attribute);
                }
                Ok(())
            }

            Task::SetSpecies { species, changes, create } => {
                Self::apply_set_species(doc, species, changes, *create)
            }

            Task::SetSpeciesLabel { label, changes, create } => {
                let name = if label == "all" {
                    "all".to_string()
                } else {
                    species::species_for_label(doc, label)?
                };
                Self::apply_set_species(doc, &name, changes, *create)
            }

            Task::SetAtomGroupAtt { changes, filter, create } => {
                Self::apply_atom_groups(doc, filter, changes, *create)
            }

            Task::SetAtomGroupAttLabel { changes, label, create } => {
                let filter = if label == "all" {
                    AtomGroupFilter::All
                } else {
                    AtomGroupFilter::Species(species::species_for_label(doc, label)?)
                };
                Self::apply_atom_groups(doc, &filter, changes, *create)
            }

            Task::SetInpChanges { changes } => Self::apply_inpchanges(doc, changes),

            Task::SetNkpts { count, gamma } => {
                let xpath = XPath::parse(KPOINT_SETS)?;
                let current = exactly_one(&xpath.select(doc), xpath.as_str())?;
                let replacement = Fragment::new("kPointCount")
                    .with_attribute("count", count.to_string())
                    .with_attribute("gamma", switch(*gamma));
                doc.replace_with_fragment(current, &replacement)
                    .ok_or_else(|| TaskError::not_found(xpath.as_str()))?;
                Ok(())
            }

            Task::AddNumToAtt { xpath, attribute, value, mode, occurrences, create } => {
                Self::apply_add_num(doc, xpath, attribute, *value, *mode, occurrences, *create)
            }
        }
    }

    fn apply_replace(
        doc: &mut Document,
        xpath: &XPath,
        element: &Fragment,
    ) -> Result<(), TaskError> {
        for id in require_nodes(doc, xpath)? {
            if is_root(doc, id) {
                return Err(TaskError::malformed(format!(
                    "replace_tag cannot replace the root element ('{}')",
                    xpath
                )));
            }
            doc.replace_with_fragment(id, element).ok_or_else(|| {
                TaskError::malformed(format!("replace_tag: '{}' matched a detached node", xpath))
            })?;
        }
        Ok(())
    }

    fn apply_set_species(
        doc: &mut Document,
        selector: &str,
        changes: &Map<String, Value>,
        create: bool,
    ) -> Result<(), TaskError> {
        for id in species::select_species(doc, selector)? {
            species::apply_species_changes(doc, id, changes, create)?;
        }
        Ok(())
    }

    fn apply_atom_groups(
        doc: &mut Document,
        filter: &AtomGroupFilter,
        changes: &Map<String, Value>,
        create: bool,
    ) -> Result<(), TaskError> {
        for id in species::select_atom_groups(doc, filter)? {
            species::apply_atom_group_changes(doc, id, changes, create)?;
        }
        Ok(())
    }

    fn apply_inpchanges(
        doc: &mut Document,
        changes: &BTreeMap<String, Value>,
    ) -> Result<(), TaskError> {
        for (key, value) in changes {
            let setting = inpchanges::lookup(key)?;
            let normalized = setting.normalize(value)?;
            let xpath = XPath::parse(setting.path)?;

            for id in require_nodes(doc, &xpath)? {
                match setting.attribute {
                    Some(attribute) => doc.set_attribute(id, attribute, normalized.clone()),
                    None => doc.set_text(id, Some(normalized.clone())),
                }
            }
        }
        Ok(())
    }

    fn apply_add_num(
        doc: &mut Document,
        xpath: &XPath,
        attribute: &str,
        value: f64,
        mode: NumMode,
        occurrences: &[i64],
        create: bool,
    ) -> Result<(), TaskError> {
        let nodes = ensure_nodes(doc, xpath, create)?;
        for id in pick_occurrences(&nodes, occurrences, xpath)? {
            let current = match doc.attribute(id, attribute) {
                Some(text) => text.trim().parse::<f64>().map_err(|_| TaskError::NotANumber {
                    attribute: attribute.to_string(),
                    value: text.to_string(),
                })?,
                None if create => 0.0,
                None => {
                    return Err(TaskError::not_found(format!("{}/@{}", xpath, attribute)));
                }
            };

            let updated = match mode {
                NumMode::Abs => current + value,
                NumMode::Rel => value,
                NumMode::Mul => current * value,
            };
            doc.set_attribute(id, attribute, updated.to_string());
        }
        Ok(())
    }

    /// Canonical wire form: `[name, {every parameter}]`
    pub fn to_raw(&self) -> RawTask {
        let kwargs = match self {
            Task::SetAttribOcc { xpath, attribute, value, occurrences, create } => json!({
                "xpathn": xpath, "attributename": attribute, "attribv": value,
                "occ": occurrences, "create": create,
            }),
            Task::SetFirstAttrib { xpath, attribute, value, create } => json!({
                "xpathn": xpath, "attributename": attribute, "attribv": value, "create": create,
            }),
            Task::SetAllAttrib { xpath, attribute, values, create } => json!({
                "xpathn": xpath, "attributename": attribute, "attribv": values.to_value(),
                "create": create,
            }),
            Task::SetText { xpath, text, create } => json!({
                "xpathn": xpath, "text": text, "create": create,
            }),
            Task::SetTextOcc { xpath, text, create, occurrence } => json!({
                "xpathn": xpath, "text": text, "create": create, "occ": occurrence,
            }),
            Task::SetAllText { xpath, text, create } => json!({
                "xpathn": xpath, "text": text.to_value(), "create": create,
            }),
            Task::CreateTag { xpath, element, create } => json!({
                "xpath": xpath, "newelement": element, "create": create,
            }),
            Task::ReplaceTag { xpath, element } => json!({
                "xpath": xpath, "newelement": element,
            }),
            Task::DeleteTag { xpath } => json!({ "xpath": xpath }),
            Task::DeleteAtt { xpath, attribute } => json!({
                "xpath": xpath, "attrib": attribute,
            }),
            Task::SetSpecies { species, changes, create } => json!({
                "species_name": species, "attributedict": changes, "create": create,
            }),
            Task::SetSpeciesLabel { label, changes, create } => json!({
                "at_label": label, "attributedict": changes, "create": create,
            }),
            Task::SetAtomGroupAtt { changes, filter, create } => {
                let (position, species) = match filter {
                    AtomGroupFilter::Position(position) => (json!(position), Value::Null),
                    AtomGroupFilter::Species(species) => (Value::Null, json!(species)),
                    AtomGroupFilter::All => (json!("all"), Value::Null),
                };
                json!({
                    "attributedict": changes, "position": position, "species": species,
                    "create": create,
                })
            }
            Task::SetAtomGroupAttLabel { changes, label, create } => json!({
                "attributedict": changes, "atom_label": label, "create": create,
            }),
            Task::SetInpChanges { changes } => json!({ "change_dict": changes }),
            Task::SetNkpts { count, gamma } => json!({ "count": count, "gamma": gamma }),
            Task::AddNumToAtt { xpath, attribute, value, mode, occurrences, create } => json!({
                "xpathn": xpath, "attributename": attribute, "set_val": value,
                "mode": mode.as_str(), "occ": occurrences, "create": create,
            }),
        };

        match kwargs {
            Value::Object(map) => RawTask::with_kwargs(self.name(), map),
            other => RawTask::new(self.name(), vec![other]),
        }
    }
}

fn is_root(doc: &Document, id: NodeId) -> bool {
    doc.parent(id).is_some_and(|p| doc.is_document(p))
}

fn first(nodes: &[NodeId], xpath: &XPath) -> Result<NodeId, TaskError> {
    nodes
        .first()
        .copied()
        .ok_or_else(|| TaskError::not_found(xpath.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleurmod_xml::{parse, Serializer};

    fn path(source: &str) -> XPath {
        XPath::parse(source).unwrap()
    }

    fn apply(source: &str, task: Task) -> Result<String, TaskError> {
        let mut doc = parse(source).unwrap();
        task.apply(&mut doc)?;
        Ok(Serializer::compact().serialize(&doc))
    }

    #[test]
    fn test_set_first_attribute() {
        let task = Task::SetFirstAttrib {
            xpath: path("/a"),
            attribute: "x".into(),
            value: "2".into(),
            create: false,
        };
        assert_eq!(apply(r#"<a x="1"/>"#, task).unwrap(), r#"<a x="2"/>"#);
    }

    #[test]
    fn test_first_match_with_no_match_fails() {
        let task = Task::SetFirstAttrib {
            xpath: path("/a/b"),
            attribute: "x".into(),
            value: "2".into(),
            create: false,
        };
        assert_eq!(
            apply("<a/>", task),
            Err(TaskError::PathNotFound("/a/b".into()))
        );
    }

    #[test]
    fn test_set_attribute_occurrences() {
        let task = Task::SetAttribOcc {
            xpath: path("/r/a"),
            attribute: "x".into(),
            value: "9".into(),
            occurrences: vec![1],
            create: false,
        };
        assert_eq!(
            apply(r#"<r><a x="1"/><a x="2"/></r>"#, task).unwrap(),
            r#"<r><a x="1"/><a x="9"/></r>"#
        );
    }

    #[test]
    fn test_set_all_attribute_per_node() {
        let task = Task::SetAllAttrib {
            xpath: path("/r/a"),
            attribute: "x".into(),
            values: NodeValues::PerNode(vec!["5".into(), "6".into()]),
            create: false,
        };
        assert_eq!(
            apply("<r><a/><a/></r>", task.clone()).unwrap(),
            r#"<r><a x="5"/><a x="6"/></r>"#
        );
        assert!(matches!(
            apply("<r><a/></r>", task),
            Err(TaskError::MalformedTask(_))
        ));
    }

    #[test]
    fn test_text_variants() {
        let last = Task::SetTextOcc {
            xpath: path("/r/t"),
            text: "z".into(),
            create: false,
            occurrence: -1,
        };
        assert_eq!(
            apply("<r><t>a</t><t>b</t></r>", last).unwrap(),
            "<r><t>a</t><t>z</t></r>"
        );

        let all = Task::SetAllText {
            xpath: path("/r/t"),
            text: NodeValues::Single("q".into()),
            create: true,
        };
        assert_eq!(apply("<r/>", all).unwrap(), "<r><t>q</t></r>");
    }

    #[test]
    fn test_create_tag() {
        let task = Task::CreateTag {
            xpath: path("/root"),
            element: Fragment::new("b"),
            create: true,
        };
        assert_eq!(apply("<root/>", task).unwrap(), "<root><b/></root>");

        let missing_parent = Task::CreateTag {
            xpath: path("/root/b"),
            element: Fragment::new("c"),
            create: false,
        };
        assert!(matches!(
            apply("<root/>", missing_parent),
            Err(TaskError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_replace_and_delete() {
        let replace = Task::ReplaceTag {
            xpath: path("/r/a"),
            element: Fragment::new("b").with_attribute("n", "1"),
        };
        assert_eq!(
            apply("<r><a/><c/></r>", replace).unwrap(),
            r#"<r><b n="1"/><c/></r>"#
        );

        let delete = Task::DeleteTag { xpath: path("/r/a") };
        assert_eq!(apply("<r><a/><c/></r>", delete.clone()).unwrap(), "<r><c/></r>");
        assert_eq!(apply("<r><c/></r>", delete).unwrap(), "<r><c/></r>");

        let delete_att = Task::DeleteAtt {
            xpath: path("/r/*"),
            attribute: "x".into(),
        };
        assert_eq!(
            apply(r#"<r><a x="1" y="2"/><c x="3"/></r>"#, delete_att).unwrap(),
            r#"<r><a y="2"/><c/></r>"#
        );
    }

    #[test]
    fn test_replace_root_rejected() {
        let replace = Task::ReplaceTag {
            xpath: path("/r"),
            element: Fragment::new("s"),
        };
        assert!(matches!(apply("<r/>", replace), Err(TaskError::MalformedTask(_))));
    }

    #[test]
    fn test_document_node_edits_rejected() {
        let malformed =
            |task: Task| matches!(apply("<r/>", task), Err(TaskError::MalformedTask(_)));

        assert!(malformed(Task::SetFirstAttrib {
            xpath: path("/"),
            attribute: "x".into(),
            value: "1".into(),
            create: false,
        }));
        assert!(malformed(Task::SetText {
            xpath: path("/"),
            text: "t".into(),
            create: true,
        }));
        assert!(malformed(Task::CreateTag {
            xpath: path("/"),
            element: Fragment::new("extra"),
            create: false,
        }));
        assert!(malformed(Task::ReplaceTag {
            xpath: path("/"),
            element: Fragment::new("s"),
        }));
        assert!(malformed(Task::DeleteTag { xpath: path("/") }));
        assert!(malformed(Task::DeleteTag { xpath: path("/r") }));
        assert!(malformed(Task::DeleteAtt {
            xpath: path("/"),
            attribute: "x".into(),
        }));
    }

    fn add_num(mode: NumMode, occurrences: Vec<i64>) -> Task {
        Task::AddNumToAtt {
            xpath: path("/a"),
            attribute: "x".into(),
            value: 5.0,
            mode,
            occurrences,
            create: false,
        }
    }

    #[test]
    fn test_add_num_modes() {
        let on_ten = |task: Task| apply(r#"<a x="10"/>"#, task).unwrap();
        assert_eq!(on_ten(add_num(NumMode::Abs, vec![0])), r#"<a x="15"/>"#);
        assert_eq!(on_ten(add_num(NumMode::Rel, vec![0])), r#"<a x="5"/>"#);
        assert_eq!(on_ten(add_num(NumMode::Mul, vec![0])), r#"<a x="50"/>"#);
        assert_eq!(
            apply(r#"<a x=".5"/>"#, add_num(NumMode::Abs, vec![-1])).unwrap(),
            r#"<a x="5.5"/>"#
        );
    }

    #[test]
    fn test_add_num_errors() {
        assert_eq!(
            apply(r#"<a x="ten"/>"#, add_num(NumMode::Abs, vec![0])),
            Err(TaskError::NotANumber {
                attribute: "x".into(),
                value: "ten".into()
            })
        );
        assert!(matches!(
            apply("<a/>", add_num(NumMode::Abs, vec![0])),
            Err(TaskError::PathNotFound(_))
        ));
        assert!(matches!(
            apply(r#"<a x="1"/>"#, add_num(NumMode::Abs, vec![1])),
            Err(TaskError::PathNotFound(_))
        ));
    }

    const KPOINTS: &str = r#"<fleurInput><calculationSetup><bzIntegration mode="hist"><kPointList count="1"><kPoint weight="1">0 0 0</kPoint></kPointList></bzIntegration></calculationSetup></fleurInput>"#;

    #[test]
    fn test_set_nkpts() {
        let task = Task::SetNkpts { count: 100, gamma: true };
        assert_eq!(
            apply(KPOINTS, task).unwrap(),
            r#"<fleurInput><calculationSetup><bzIntegration mode="hist"><kPointCount count="100" gamma="T"/></bzIntegration></calculationSetup></fleurInput>"#
        );
        assert!(matches!(
            apply("<fleurInput/>", Task::SetNkpts { count: 1, gamma: false }),
            Err(TaskError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_inpchanges() {
        let changes = BTreeMap::from([
            ("mode".to_string(), json!("gauss")),
            ("fermiSmearingEnergy".to_string(), json!(0.001)),
        ]);
        let out = apply(KPOINTS, Task::SetInpChanges { changes }).unwrap();
        assert!(out.contains(r#"<bzIntegration mode="gauss" fermiSmearingEnergy="0.0010000000">"#));

        let missing = BTreeMap::from([("itmax".to_string(), json!(1))]);
        assert!(matches!(
            apply(KPOINTS, Task::SetInpChanges { changes: missing }),
            Err(TaskError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_canonical_raw_form() {
        let raw = add_num(NumMode::Rel, vec![0]).to_raw();
        assert_eq!(
            serde_json::to_value(&raw).unwrap(),
            json!(["add_num_to_att", {
                "xpathn": "/a", "attributename": "x", "set_val": 5.0,
                "mode": "rel", "occ": [0], "create": false
            }])
        );

        let raw = Task::CreateTag {
            xpath: path("/r"),
            element: Fragment::new("b").with_attribute("n", "1"),
            create: false,
        }
        .to_raw();
        assert_eq!(
            raw.args,
            vec![json!({"xpath": "/r", "newelement": "<b n=\"1\"/>", "create": false})]
        );
    }
}
