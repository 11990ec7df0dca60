//! # Document Tree
//!
//! Arena-backed XML element tree.
//!
//! Nodes live in a single `Vec` and are addressed by [`NodeId`]. Index 0 is
//! the document node; its only element child is the root element. Removing a
//! node detaches it from its parent but never frees the slot, so ids handed
//! out earlier stay valid handles (they simply stop being reachable).
//!
//! Cloning a [`Document`] copies the whole arena. There is no shared
//! structure between two documents, which is what lets a modification
//! session edit a working copy while other readers keep using the baseline.

use crate::error::{XmlError, XmlResult};
use serde::{Deserialize, Serialize};

/// Handle to a node inside one [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Attribute on an element (insertion order is kept)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    /// Qualified element name, empty for the document node
    name: String,
    attributes: Vec<Attribute>,
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn element(name: String, parent: Option<NodeId>) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            text: None,
            parent,
            children: Vec::new(),
        }
    }
}

/// Editable XML document
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

const DOCUMENT_NODE: NodeId = NodeId(0);

impl Document {
    /// Create a document with an empty root element
    pub fn new(root_name: &str) -> XmlResult<Self> {
        validate_name(root_name)?;
        Ok(Self::from_fragment(&Fragment::new(root_name)))
    }

    /// Create a document whose root element is a copy of `fragment`
    pub fn from_fragment(fragment: &Fragment) -> Self {
        let mut doc = Self {
            nodes: vec![NodeData::element(String::new(), None)],
        };
        doc.append_fragment(DOCUMENT_NODE, fragment);
        doc
    }

    pub fn document_node(&self) -> NodeId {
        DOCUMENT_NODE
    }

    /// Root element, `None` only if it was deleted
    pub fn root_element(&self) -> Option<NodeId> {
        self.nodes[DOCUMENT_NODE.0].children.first().copied()
    }

    pub fn is_document(&self, id: NodeId) -> bool {
        id == DOCUMENT_NODE
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Child elements with the given name, in document order
    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(move |child| self.nodes[child.0].name == name)
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        &self.nodes[id.0].attributes
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id.0]
            .attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing the value in place if it already exists
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        let attributes = &mut self.nodes[id.0].attributes;
        match attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => attributes.push(Attribute::new(name, value)),
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        let attributes = &mut self.nodes[id.0].attributes;
        let pos = attributes.iter().position(|a| a.name == name)?;
        Some(attributes.remove(pos).value)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.0].text.as_deref()
    }

    pub fn set_text(&mut self, id: NodeId, text: Option<String>) {
        self.nodes[id.0].text = text;
    }

    /// Append a new empty element to `parent`
    pub fn append_element(&mut self, parent: NodeId, name: &str) -> XmlResult<NodeId> {
        validate_name(name)?;
        let id = self.push_node(NodeData::element(name.to_string(), Some(parent)));
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Append a deep copy of `fragment` to `parent`
    pub fn append_fragment(&mut self, parent: NodeId, fragment: &Fragment) -> NodeId {
        let index = self.nodes[parent.0].children.len();
        self.insert_fragment(parent, index, fragment)
    }

    /// Insert a deep copy of `fragment` as child number `index` of `parent`
    pub fn insert_fragment(&mut self, parent: NodeId, index: usize, fragment: &Fragment) -> NodeId {
        let id = self.build_subtree(parent, fragment);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, id);
        id
    }

    fn build_subtree(&mut self, parent: NodeId, fragment: &Fragment) -> NodeId {
        let mut data = NodeData::element(fragment.name.clone(), Some(parent));
        data.attributes = fragment.attributes.clone();
        data.text = fragment.text.clone();
        let id = self.push_node(data);

        for child in &fragment.children {
            let child_id = self.build_subtree(id, child);
            self.nodes[id.0].children.push(child_id);
        }

        id
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(data);
        NodeId(self.nodes.len() - 1)
    }

    /// Remove a node (and its subtree) from its parent
    ///
    /// Returns the index the node had among its siblings.
    pub fn detach(&mut self, id: NodeId) -> Option<usize> {
        let parent = self.nodes[id.0].parent.take()?;
        let siblings = &mut self.nodes[parent.0].children;
        let pos = siblings.iter().position(|c| *c == id)?;
        siblings.remove(pos);
        Some(pos)
    }

    /// Replace `id` with a copy of `fragment` at the same position
    pub fn replace_with_fragment(&mut self, id: NodeId, fragment: &Fragment) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let pos = self.detach(id)?;
        Some(self.insert_fragment(parent, pos, fragment))
    }

    /// Index of `id` among its parent's children
    pub fn position_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.nodes[parent.0].children.iter().position(|c| *c == id)
    }

    /// `id` and all of its descendants in document order
    pub fn descendants_or_self(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next.0].children.iter().rev().copied());
        }
        out
    }

    /// Rank of every arena slot in document order; detached nodes get `usize::MAX`
    pub fn document_order(&self) -> Vec<usize> {
        let mut order = vec![usize::MAX; self.nodes.len()];
        for (rank, id) in self.descendants_or_self(DOCUMENT_NODE).into_iter().enumerate() {
            order[id.0] = rank;
        }
        order
    }

    /// Whether `id` is still reachable from the document node
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == DOCUMENT_NODE {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Owned copy of the subtree rooted at `id`
    pub fn to_fragment(&self, id: NodeId) -> Fragment {
        let data = &self.nodes[id.0];
        Fragment {
            name: data.name.clone(),
            attributes: data.attributes.clone(),
            text: data.text.clone(),
            children: data.children.iter().map(|c| self.to_fragment(*c)).collect(),
        }
    }

    /// Root element as a fragment
    pub fn root_fragment(&self) -> XmlResult<Fragment> {
        self.root_element()
            .map(|root| self.to_fragment(root))
            .ok_or(XmlError::MissingRoot)
    }

    /// Slash-separated element names from the root to `id`, with 1-based
    /// indices for repeated siblings (used in diagnostics)
    pub fn display_path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            let name = self.name(current);
            let same_name: Vec<NodeId> = self.children_named(parent, name).collect();
            if same_name.len() > 1 {
                let pos = same_name.iter().position(|c| *c == current).unwrap_or(0);
                segments.push(format!("{}[{}]", name, pos + 1));
            } else {
                segments.push(name.to_string());
            }
            current = parent;
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }
}

/// Documents are equal when their reachable trees are equal; detached
/// arena slots are ignored.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        match (self.root_element(), other.root_element()) {
            (Some(a), Some(b)) => self.to_fragment(a) == other.to_fragment(b),
            (None, None) => true,
            _ => false,
        }
    }
}

/// Detached, owned element subtree
///
/// Used as the payload of tag creation and replacement. On the wire a
/// fragment is its markup (`<b x="1"/>`); a bare name such as `"b"` is
/// accepted as shorthand for an empty element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub text: Option<String>,
    pub children: Vec<Fragment>,
}

impl Fragment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(name, value));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Fragment) -> Self {
        self.children.push(child);
        self
    }

    /// Parse a bare tag name or an XML snippet
    pub fn parse(source: &str) -> XmlResult<Self> {
        let trimmed = source.trim();
        if trimmed.starts_with('<') {
            crate::parser::parse_fragment(trimmed)
        } else {
            validate_name(trimmed)?;
            Ok(Self::new(trimmed))
        }
    }

    /// Compact markup of this fragment
    pub fn to_markup(&self) -> String {
        crate::serializer::Serializer::compact().serialize_fragment(self)
    }
}

impl Serialize for Fragment {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_markup())
    }
}

impl<'de> Deserialize<'de> for Fragment {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Fragment::parse(&source).map_err(serde::de::Error::custom)
    }
}

/// Check that `name` is a usable (optionally prefixed) XML element name
pub fn validate_name(name: &str) -> XmlResult<()> {
    let mut parts = name.split(':');
    let valid = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), None, None) => is_ncname(local),
        (Some(prefix), Some(local), None) => is_ncname(prefix) && is_ncname(local),
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(XmlError::InvalidName(name.to_string()))
    }
}

fn is_ncname(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
