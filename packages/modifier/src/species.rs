//! # Species and Atom Groups
//!
//! Composite edits on `atomSpecies/species` and `atomGroups/atomGroup`.
//!
//! A species change dict maps keys to values:
//!
//! - `mtSphere`, `atomicCutoffs`, `energyParameters`, `special`, `force`,
//!   `nocoParams`, `prodBasis`: a mapping of attributes for that child
//! - `lo`, `ldaU`: a mapping (or list of mappings); existing entries are
//!   dropped and one element is created per mapping
//! - `electronConfig`: `coreConfig`/`valenceConfig` text plus
//!   `stateOccupation` mapping(s), which replace the existing ones
//! - anything else: a scalar attribute of the species element
//!
//! Atom groups take `force` and `nocoParams` as a mapping or a list of
//! `[attribute, value]` pairs; other keys are atom group attributes.

use crate::args::{check_attribute_name, scalar_string};
use crate::errors::TaskError;
use crate::navigate::ensure_child;
use fleurmod_xml::{quote_literal, Document, NodeId, XPath};
use serde_json::{Map, Value};

pub(crate) const SPECIES_PATH: &str = "/fleurInput/atomSpecies/species";
pub(crate) const ATOM_GROUP_PATH: &str = "/fleurInput/atomGroups/atomGroup";

const SPECIES_CHILDREN: &[&str] = &[
    "mtSphere",
    "atomicCutoffs",
    "energyParameters",
    "special",
    "force",
    "nocoParams",
    "prodBasis",
];
const SPECIES_REPEATED: &[&str] = &["lo", "ldaU"];
const ATOM_GROUP_CHILDREN: &[&str] = &["force", "nocoParams"];
const POSITION_TAGS: &[&str] = &["relPos", "absPos", "filmPos"];

/// Which atom groups an atom group edit applies to
#[derive(Debug, Clone, PartialEq)]
pub enum AtomGroupFilter {
    /// 1-based position among all atom groups
    Position(usize),
    Species(String),
    All,
}

/// Species elements selected by name, `all`, or `all-<substring>`
pub(crate) fn select_species(doc: &Document, selector: &str) -> Result<Vec<NodeId>, TaskError> {
    let selected = if selector == "all" {
        XPath::parse(SPECIES_PATH)?.select(doc)
    } else if let Some(fragment) = selector.strip_prefix("all-") {
        XPath::parse(SPECIES_PATH)?
            .select(doc)
            .into_iter()
            .filter(|id| doc.attribute(*id, "name").is_some_and(|n| n.contains(fragment)))
            .collect()
    } else {
        species_xpath(selector)?.select(doc)
    };

    if selected.is_empty() {
        return Err(TaskError::not_found(species_xpath(selector)?.as_str()));
    }
    Ok(selected)
}

fn species_xpath(name: &str) -> Result<XPath, TaskError> {
    Ok(XPath::parse(&format!("{}[@name={}]", SPECIES_PATH, quote_literal(name)))?)
}

/// Name of the species owning the atom labelled `label`
///
/// Labels are right-aligned in the file, so both sides are trimmed.
pub(crate) fn species_for_label(doc: &Document, label: &str) -> Result<String, TaskError> {
    let wanted = label.trim();
    let mut species: Vec<&str> = Vec::new();

    for group in XPath::parse(ATOM_GROUP_PATH)?.select(doc) {
        let labelled = doc
            .children(group)
            .iter()
            .filter(|c| POSITION_TAGS.contains(&doc.name(**c)))
            .any(|c| doc.attribute(*c, "label").is_some_and(|l| l.trim() == wanted));
        if !labelled {
            continue;
        }
        if let Some(name) = doc.attribute(group, "species") {
            if !species.contains(&name) {
                species.push(name);
            }
        }
    }

    match species.as_slice() {
        [] => Err(TaskError::not_found(format!("atom with label '{}'", wanted))),
        [one] => Ok(one.to_string()),
        _ => Err(TaskError::AmbiguousMatch {
            path: format!("atom with label '{}'", wanted),
            count: species.len(),
        }),
    }
}

pub(crate) fn select_atom_groups(
    doc: &Document,
    filter: &AtomGroupFilter,
) -> Result<Vec<NodeId>, TaskError> {
    let groups = XPath::parse(ATOM_GROUP_PATH)?.select(doc);
    let selected: Vec<NodeId> = match filter {
        AtomGroupFilter::All => groups,
        AtomGroupFilter::Position(position) => position
            .checked_sub(1)
            .and_then(|i| groups.get(i).copied())
            .into_iter()
            .collect(),
        AtomGroupFilter::Species(name) if name == "all" => groups,
        AtomGroupFilter::Species(name) => groups
            .into_iter()
            .filter(|id| doc.attribute(*id, "species") == Some(name.as_str()))
            .collect(),
    };

    if selected.is_empty() {
        let path = match filter {
            AtomGroupFilter::Position(position) => format!("{}[{}]", ATOM_GROUP_PATH, position),
            AtomGroupFilter::Species(name) => {
                format!("{}[@species={}]", ATOM_GROUP_PATH, quote_literal(name))
            }
            AtomGroupFilter::All => ATOM_GROUP_PATH.to_string(),
        };
        return Err(TaskError::not_found(path));
    }
    Ok(selected)
}

/// Check the shape of a species change dict
pub(crate) fn check_species_changes(changes: &Map<String, Value>) -> Result<(), TaskError> {
    for (key, value) in changes {
        if SPECIES_CHILDREN.contains(&key.as_str()) {
            attribute_map(key, value)?;
        } else if SPECIES_REPEATED.contains(&key.as_str()) {
            repeated_maps(key, value)?;
        } else if key == "electronConfig" {
            check_electron_config(value)?;
        } else {
            attribute(key, value)?;
        }
    }
    Ok(())
}

pub(crate) fn check_atom_group_changes(changes: &Map<String, Value>) -> Result<(), TaskError> {
    for (key, value) in changes {
        if ATOM_GROUP_CHILDREN.contains(&key.as_str()) {
            attribute_pairs(key, value)?;
        } else {
            attribute(key, value)?;
        }
    }
    Ok(())
}

/// Apply a species change dict to one species element
pub(crate) fn apply_species_changes(
    doc: &mut Document,
    species: NodeId,
    changes: &Map<String, Value>,
    create: bool,
) -> Result<(), TaskError> {
    for (key, value) in changes {
        if SPECIES_CHILDREN.contains(&key.as_str()) {
            let child = ensure_child(doc, species, key, create)?;
            for (name, attr) in attribute_map(key, value)? {
                doc.set_attribute(child, &name, attr);
            }
        } else if SPECIES_REPEATED.contains(&key.as_str()) {
            let entries = repeated_maps(key, value)?;
            replace_children(doc, species, key, &entries)?;
        } else if key == "electronConfig" {
            apply_electron_config(doc, species, value, create)?;
        } else {
            doc.set_attribute(species, key, attribute(key, value)?);
        }
    }
    Ok(())
}

pub(crate) fn apply_atom_group_changes(
    doc: &mut Document,
    group: NodeId,
    changes: &Map<String, Value>,
    create: bool,
) -> Result<(), TaskError> {
    for (key, value) in changes {
        if ATOM_GROUP_CHILDREN.contains(&key.as_str()) {
            let child = ensure_child(doc, group, key, create)?;
            for (name, attr) in attribute_pairs(key, value)? {
                doc.set_attribute(child, &name, attr);
            }
        } else {
            doc.set_attribute(group, key, attribute(key, value)?);
        }
    }
    Ok(())
}

fn apply_electron_config(
    doc: &mut Document,
    species: NodeId,
    value: &Value,
    create: bool,
) -> Result<(), TaskError> {
    let config = ensure_child(doc, species, "electronConfig", create)?;
    let Value::Object(fields) = value else {
        return Err(malformed("electronConfig", "a mapping"));
    };

    for (key, value) in fields {
        match key.as_str() {
            "coreConfig" | "valenceConfig" => {
                let child = ensure_child(doc, config, key, true)?;
                doc.set_text(child, Some(scalar(key, value)?));
            }
            "stateOccupation" => {
                let entries = repeated_maps(key, value)?;
                replace_children(doc, config, key, &entries)?;
            }
            _ => return Err(malformed(key, "coreConfig, valenceConfig or stateOccupation")),
        }
    }
    Ok(())
}

/// Drop every `name` child of `parent` and append one per attribute set
fn replace_children(
    doc: &mut Document,
    parent: NodeId,
    name: &str,
    entries: &[Vec<(String, String)>],
) -> Result<(), TaskError> {
    let existing: Vec<NodeId> = doc.children_named(parent, name).collect();
    for id in existing {
        doc.detach(id);
    }

    for attributes in entries {
        let id = doc.append_element(parent, name)?;
        for (attr, value) in attributes {
            doc.set_attribute(id, attr, value.clone());
        }
    }
    Ok(())
}

fn check_electron_config(value: &Value) -> Result<(), TaskError> {
    let Value::Object(fields) = value else {
        return Err(malformed("electronConfig", "a mapping"));
    };
    for (key, value) in fields {
        match key.as_str() {
            "coreConfig" | "valenceConfig" => {
                scalar(key, value)?;
            }
            "stateOccupation" => {
                repeated_maps(key, value)?;
            }
            _ => return Err(malformed(key, "coreConfig, valenceConfig or stateOccupation")),
        }
    }
    Ok(())
}

fn scalar(key: &str, value: &Value) -> Result<String, TaskError> {
    scalar_string(value).ok_or_else(|| malformed(key, "a scalar"))
}

/// Scalar value of the attribute `name`
fn attribute(name: &str, value: &Value) -> Result<String, TaskError> {
    check_attribute_name(name)?;
    scalar(name, value)
}

fn attribute_map(key: &str, value: &Value) -> Result<Vec<(String, String)>, TaskError> {
    let Value::Object(map) = value else {
        return Err(malformed(key, "a mapping of attributes"));
    };
    map.iter()
        .map(|(name, value)| Ok((name.clone(), attribute(name, value)?)))
        .collect()
}

fn repeated_maps(key: &str, value: &Value) -> Result<Vec<Vec<(String, String)>>, TaskError> {
    match value {
        Value::Array(items) => items.iter().map(|item| attribute_map(key, item)).collect(),
        _ => Ok(vec![attribute_map(key, value)?]),
    }
}

/// A mapping or a list of `[attribute, value]` pairs
fn attribute_pairs(key: &str, value: &Value) -> Result<Vec<(String, String)>, TaskError> {
    let Value::Array(items) = value else {
        return attribute_map(key, value);
    };

    items
        .iter()
        .map(|item| match item.as_array().map(Vec::as_slice) {
            Some([Value::String(name), value]) => Ok((name.clone(), attribute(name, value)?)),
            _ => Err(malformed(key, "a mapping or a list of [attribute, value] pairs")),
        })
        .collect()
}

fn malformed(key: &str, expected: &str) -> TaskError {
    TaskError::malformed(format!("value for '{}' must be {}", key, expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleurmod_xml::{parse, Serializer};
    use serde_json::json;

    const INPUT: &str = r#"<fleurInput>
        <atomSpecies>
            <species name="Fe-1" element="Fe"><mtSphere radius="2.2"/><lo type="SCLO" l="1"/></species>
            <species name="Pt-1" element="Pt"><mtSphere radius="2.3"/></species>
            <species name="Fe-2" element="Fe"><mtSphere radius="2.4"/></species>
        </atomSpecies>
        <atomGroups>
            <atomGroup species="Fe-1"><relPos label="                   1">0 0 0</relPos></atomGroup>
            <atomGroup species="Pt-1"><relPos label="                   2">0.5 0.5 0.5</relPos><force calculate="T"/></atomGroup>
        </atomGroups>
    </fleurInput>"#;

    fn compact(doc: &Document, id: NodeId) -> String {
        Serializer::compact().serialize_fragment(&doc.to_fragment(id))
    }

    fn changes(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_species_selectors() {
        let doc = parse(INPUT).unwrap();
        assert_eq!(select_species(&doc, "Fe-1").unwrap().len(), 1);
        assert_eq!(select_species(&doc, "all").unwrap().len(), 3);
        assert_eq!(select_species(&doc, "all-Fe").unwrap().len(), 2);
        assert!(matches!(
            select_species(&doc, "Co-1"),
            Err(TaskError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_species_for_label_trims() {
        let doc = parse(INPUT).unwrap();
        assert_eq!(species_for_label(&doc, "2").unwrap(), "Pt-1");
        assert_eq!(species_for_label(&doc, "  1 ").unwrap(), "Fe-1");
        assert!(species_for_label(&doc, "3").is_err());
    }

    #[test]
    fn test_atom_group_filters() {
        let doc = parse(INPUT).unwrap();
        assert_eq!(select_atom_groups(&doc, &AtomGroupFilter::All).unwrap().len(), 2);
        assert_eq!(select_atom_groups(&doc, &AtomGroupFilter::Position(2)).unwrap().len(), 1);
        assert!(select_atom_groups(&doc, &AtomGroupFilter::Position(0)).is_err());
        assert!(select_atom_groups(&doc, &AtomGroupFilter::Species("Co-1".into())).is_err());
    }

    #[test]
    fn test_species_changes() {
        let mut doc = parse(INPUT).unwrap();
        let species = select_species(&doc, "Fe-1").unwrap()[0];
        let dict = changes(json!({
            "mtSphere": {"radius": 2.0},
            "lo": [{"type": "SCLO", "l": 0}, {"type": "SCLO", "l": 2}],
            "magMom": 1.5
        }));

        check_species_changes(&dict).unwrap();
        apply_species_changes(&mut doc, species, &dict, false).unwrap();
        assert_eq!(
            compact(&doc, species),
            r#"<species name="Fe-1" element="Fe" magMom="1.5"><mtSphere radius="2.0"/><lo l="0" type="SCLO"/><lo l="2" type="SCLO"/></species>"#
        );
    }

    #[test]
    fn test_missing_species_child_needs_create() {
        let mut doc = parse(INPUT).unwrap();
        let species = select_species(&doc, "Pt-1").unwrap()[0];
        let dict = changes(json!({"special": {"socscale": 0.5}}));

        assert!(matches!(
            apply_species_changes(&mut doc, species, &dict, false),
            Err(TaskError::PathNotFound(_))
        ));
        apply_species_changes(&mut doc, species, &dict, true).unwrap();
        assert!(compact(&doc, species).contains(r#"<special socscale="0.5"/>"#));
    }

    #[test]
    fn test_electron_config() {
        let mut doc = parse(INPUT).unwrap();
        let species = select_species(&doc, "Pt-1").unwrap()[0];
        let dict = changes(json!({
            "electronConfig": {
                "coreConfig": "[Xe]",
                "stateOccupation": {"state": "(5d5/2)", "spinUp": "2.0", "spinDown": "2.0"}
            }
        }));

        apply_species_changes(&mut doc, species, &dict, true).unwrap();
        assert!(compact(&doc, species).contains(
            r#"<electronConfig><coreConfig>[Xe]</coreConfig><stateOccupation spinDown="2.0" spinUp="2.0" state="(5d5/2)"/></electronConfig>"#
        ));
    }

    #[test]
    fn test_malformed_species_changes() {
        assert!(check_species_changes(&changes(json!({"mtSphere": 2}))).is_err());
        assert!(check_species_changes(&changes(json!({"lo": [1]}))).is_err());
        assert!(check_species_changes(&changes(json!({"magMom": [1]}))).is_err());
        assert!(check_species_changes(&changes(json!({"electronConfig": {"x": 1}}))).is_err());
    }

    #[test]
    fn test_atom_group_pairs() {
        let mut doc = parse(INPUT).unwrap();
        let group = select_atom_groups(&doc, &AtomGroupFilter::Position(2)).unwrap()[0];
        let dict = changes(json!({"force": [["relaxXYZ", "FFT"]], "species": "Pt-1"}));

        check_atom_group_changes(&dict).unwrap();
        apply_atom_group_changes(&mut doc, group, &dict, false).unwrap();
        assert!(compact(&doc, group).contains(r#"<force calculate="T" relaxXYZ="FFT"/>"#));
    }

    #[test]
    fn test_attribute_keys_must_be_names() {
        let malformed_species = |value: Value| {
            matches!(
                check_species_changes(&changes(value)),
                Err(TaskError::MalformedTask(_))
            )
        };
        assert!(malformed_species(json!({"mag Mom": 1.5})));
        assert!(malformed_species(json!({"mtSphere": {"radius\"": 2.0}})));
        assert!(malformed_species(json!({"ldaU": [{"l": 2}, {"U=": 4.0}]})));
        assert!(malformed_species(json!({"electronConfig": {"stateOccupation": {"1s": 2}}})));

        let malformed_group = |value: Value| {
            matches!(
                check_atom_group_changes(&changes(value)),
                Err(TaskError::MalformedTask(_))
            )
        };
        assert!(malformed_group(json!({"a\"b": 1})));
        assert!(malformed_group(json!({"force": [["relax XYZ", "FFT"]]})));
        assert!(malformed_group(json!({"nocoParams": {"<beta>": 0.5}})));

        let mut doc = parse(INPUT).unwrap();
        let group = select_atom_groups(&doc, &AtomGroupFilter::Position(1)).unwrap()[0];
        let bad = changes(json!({"bad name": 1}));
        assert!(apply_atom_group_changes(&mut doc, group, &bad, true).is_err());
        assert_eq!(doc.attribute(group, "bad name"), None);
    }
}
