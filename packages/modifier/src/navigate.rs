//! Path helpers shared by the task appliers

use crate::errors::TaskError;
use fleurmod_xml::{Document, NodeId, XPath};

/// Elements matched by `xpath`, creating them when nothing matches and
/// `create` is set
pub(crate) fn ensure_nodes(
    doc: &mut Document,
    xpath: &XPath,
    create: bool,
) -> Result<Vec<NodeId>, TaskError> {
    let found = ensure_matches(doc, xpath, create)?;
    elements_only(doc, xpath, found)
}

/// Matches of `xpath`, or `PathNotFound`
pub(crate) fn require_nodes(doc: &Document, xpath: &XPath) -> Result<Vec<NodeId>, TaskError> {
    let found = select_elements(doc, xpath)?;
    if found.is_empty() {
        Err(TaskError::not_found(xpath.as_str()))
    } else {
        Ok(found)
    }
}

/// Matches of `xpath`, possibly none; the document node is not editable
pub(crate) fn select_elements(doc: &Document, xpath: &XPath) -> Result<Vec<NodeId>, TaskError> {
    elements_only(doc, xpath, xpath.select(doc))
}

fn elements_only(
    doc: &Document,
    xpath: &XPath,
    nodes: Vec<NodeId>,
) -> Result<Vec<NodeId>, TaskError> {
    if nodes.iter().any(|id| doc.is_document(*id)) {
        return Err(TaskError::malformed(format!(
            "path '{}' selects the document node, not an element",
            xpath
        )));
    }
    Ok(nodes)
}

fn ensure_matches(
    doc: &mut Document,
    xpath: &XPath,
    create: bool,
) -> Result<Vec<NodeId>, TaskError> {
    let found = xpath.select(doc);
    if !found.is_empty() {
        return Ok(found);
    }
    if !create {
        return Err(TaskError::not_found(xpath.as_str()));
    }
    create_path(doc, xpath)
}

fn create_path(doc: &mut Document, xpath: &XPath) -> Result<Vec<NodeId>, TaskError> {
    let plan = xpath.creation_plan().ok_or_else(|| {
        TaskError::malformed(format!("cannot create nodes for path '{}'", xpath))
    })?;

    let parents = ensure_matches(doc, &plan.parent, true)?;
    let mut created = Vec::with_capacity(parents.len());
    for parent in parents {
        if doc.is_document(parent) && doc.root_element().is_some() {
            return Err(TaskError::malformed(format!(
                "path '{}' would create a second root element",
                xpath
            )));
        }
        let id = doc.append_element(parent, &plan.name)?;
        for attr in &plan.attributes {
            doc.set_attribute(id, &attr.name, attr.value.clone());
        }
        tracing::trace!(element = %plan.name, "Created missing element");
        created.push(id);
    }
    Ok(created)
}

/// Pick matches by 0-based index; `-1` anywhere in the list picks all
pub(crate) fn pick_occurrences(
    nodes: &[NodeId],
    occurrences: &[i64],
    path: &XPath,
) -> Result<Vec<NodeId>, TaskError> {
    if occurrences.contains(&-1) {
        return Ok(nodes.to_vec());
    }

    let mut picked = Vec::with_capacity(occurrences.len());
    for occ in occurrences {
        let id = usize::try_from(*occ)
            .ok()
            .and_then(|i| nodes.get(i))
            .ok_or_else(|| {
                TaskError::not_found(format!("{} (occurrence {} of {})", path, occ, nodes.len()))
            })?;
        if !picked.contains(id) {
            picked.push(*id);
        }
    }
    Ok(picked)
}

/// Pick one match; negative indices count from the end
pub(crate) fn pick_index(nodes: &[NodeId], index: i64, path: &XPath) -> Result<NodeId, TaskError> {
    let resolved = if index < 0 {
        i64::try_from(nodes.len()).ok().map(|len| len + index)
    } else {
        Some(index)
    };

    resolved
        .and_then(|i| usize::try_from(i).ok())
        .and_then(|i| nodes.get(i).copied())
        .ok_or_else(|| {
            TaskError::not_found(format!("{} (occurrence {} of {})", path, index, nodes.len()))
        })
}

pub(crate) fn exactly_one(nodes: &[NodeId], path: &str) -> Result<NodeId, TaskError> {
    match nodes {
        [] => Err(TaskError::not_found(path)),
        [one] => Ok(*one),
        _ => Err(TaskError::AmbiguousMatch {
            path: path.to_string(),
            count: nodes.len(),
        }),
    }
}

/// First child of `parent` named `name`, appended when missing and `create`
pub(crate) fn ensure_child(
    doc: &mut Document,
    parent: NodeId,
    name: &str,
    create: bool,
) -> Result<NodeId, TaskError> {
    if let Some(child) = doc.children_named(parent, name).next() {
        return Ok(child);
    }
    if !create {
        return Err(TaskError::not_found(format!("{}/{}", doc.display_path(parent), name)));
    }
    Ok(doc.append_element(parent, name)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleurmod_xml::{parse, Serializer};

    fn path(source: &str) -> XPath {
        XPath::parse(source).unwrap()
    }

    #[test]
    fn test_ensure_nodes_creates_chain() {
        let mut doc = parse("<root/>").unwrap();
        let created = ensure_nodes(&mut doc, &path("/root/a/b[@n=\"1\"]"), true).unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(
            Serializer::compact().serialize(&doc),
            r#"<root><a><b n="1"/></a></root>"#
        );
    }

    #[test]
    fn test_ensure_nodes_without_create() {
        let mut doc = parse("<root/>").unwrap();
        let result = ensure_nodes(&mut doc, &path("/root/a"), false);
        assert_eq!(result, Err(TaskError::PathNotFound("/root/a".to_string())));
    }

    #[test]
    fn test_second_root_rejected() {
        let mut doc = parse("<root/>").unwrap();
        assert!(matches!(
            ensure_nodes(&mut doc, &path("other"), true),
            Err(TaskError::MalformedTask(_))
        ));
    }

    #[test]
    fn test_document_node_is_not_editable() {
        let mut doc = parse("<r/>").unwrap();
        assert!(matches!(
            ensure_nodes(&mut doc, &path("/"), false),
            Err(TaskError::MalformedTask(_))
        ));
        assert!(matches!(require_nodes(&doc, &path("/")), Err(TaskError::MalformedTask(_))));
        assert!(matches!(select_elements(&doc, &path("/")), Err(TaskError::MalformedTask(_))));
        assert_eq!(require_nodes(&doc, &path("/r")).unwrap().len(), 1);
    }

    #[test]
    fn test_pick_occurrences() {
        let doc = parse("<r><a/><a/><a/></r>").unwrap();
        let p = path("/r/a");
        let nodes = p.select(&doc);

        assert_eq!(pick_occurrences(&nodes, &[2, 0, 2], &p).unwrap(), vec![nodes[2], nodes[0]]);
        assert_eq!(pick_occurrences(&nodes, &[0, -1], &p).unwrap(), nodes);
        assert!(matches!(
            pick_occurrences(&nodes, &[3], &p),
            Err(TaskError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_pick_index_from_end() {
        let doc = parse("<r><a/><a/></r>").unwrap();
        let p = path("/r/a");
        let nodes = p.select(&doc);
        assert_eq!(pick_index(&nodes, -1, &p).unwrap(), nodes[1]);
        assert!(pick_index(&nodes, -3, &p).is_err());
    }

    #[test]
    fn test_exactly_one() {
        let doc = parse("<r><a/><a/></r>").unwrap();
        let nodes = path("/r/a").select(&doc);
        assert_eq!(
            exactly_one(&nodes, "/r/a"),
            Err(TaskError::AmbiguousMatch {
                path: "/r/a".to_string(),
                count: 2
            })
        );
    }
}
