//! XInclude expansion
//!
//! Fleur input files keep parts of the input (symmetry operations, k-point
//! sets, relaxation data) in sibling files pulled in with
//! `<xi:include href="sym.xml"/>`. Validation needs the expanded tree, while
//! the stored file must keep its directives, so expansion always works on
//! a copy.

use crate::error::IncludeError;
use fleurmod_common::FileSystem;
use fleurmod_xml::{Document, Fragment, NodeId, XPath};
use std::path::{Path, PathBuf};

pub const XINCLUDE_NAMESPACE: &str = "http://www.w3.org/2001/XInclude";

/// Resolves include directives against files relative to a base directory
pub struct IncludeResolver<'a> {
    fs: &'a dyn FileSystem,
    base_dir: PathBuf,
}

impl<'a> IncludeResolver<'a> {
    pub fn new(fs: &'a dyn FileSystem, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            base_dir: base_dir.into(),
        }
    }

    /// Return a copy of `doc` with every include replaced by its target
    pub fn resolve(&self, doc: &Document) -> Result<Document, IncludeError> {
        let mut resolved = doc.clone();
        let mut stack = Vec::new();
        self.expand(&mut resolved, &self.base_dir, &mut stack)?;
        Ok(resolved)
    }

    fn expand(
        &self,
        doc: &mut Document,
        base_dir: &Path,
        stack: &mut Vec<PathBuf>,
    ) -> Result<(), IncludeError> {
        let includes: Vec<NodeId> = doc
            .descendants_or_self(doc.document_node())
            .into_iter()
            .filter(|id| is_xinclude(doc, *id, "include"))
            .collect();

        for id in includes {
            // Nested inside an include that was already replaced
            if !doc.is_attached(id) {
                continue;
            }

            let href = doc
                .attribute(id, "href")
                .ok_or_else(|| IncludeError::MissingHref {
                    element: doc.display_path(id),
                })?
                .to_string();
            let target = base_dir.join(&href);

            if stack.contains(&target) {
                return Err(IncludeError::Cycle { href });
            }

            if !self.fs.exists(&target) {
                let fallback = doc
                    .children(id)
                    .iter()
                    .copied()
                    .find(|c| is_xinclude(doc, *c, "fallback"));
                match fallback {
                    Some(fallback) => {
                        let content: Vec<Fragment> = doc
                            .children(fallback)
                            .iter()
                            .map(|c| doc.to_fragment(*c))
                            .collect();
                        splice(doc, id, &content);
                        continue;
                    }
                    None => return Err(IncludeError::MissingTarget { href }),
                }
            }

            tracing::debug!(href = %href, "Expanding include");
            let mut included = self.fs.read_document(&target)?;
            let nested_base = target.parent().map(Path::to_path_buf).unwrap_or_default();
            stack.push(target);
            self.expand(&mut included, &nested_base, stack)?;
            stack.pop();

            let content = match doc.attribute(id, "xpointer") {
                Some(pointer) => select_pointer(&included, &href, pointer)?,
                None => vec![included.root_fragment()?],
            };
            splice(doc, id, &content);
        }

        Ok(())
    }
}

/// `href` of every include directive in `doc`, without duplicates
pub fn include_targets(doc: &Document) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    for id in doc.descendants_or_self(doc.document_node()) {
        if !is_xinclude(doc, id, "include") {
            continue;
        }
        if let Some(href) = doc.attribute(id, "href") {
            if !targets.iter().any(|t| t == href) {
                targets.push(href.to_string());
            }
        }
    }
    targets
}

/// Replace `id` with `content` (possibly several siblings, possibly none)
fn splice(doc: &mut Document, id: NodeId, content: &[Fragment]) {
    let Some(parent) = doc.parent(id) else {
        return;
    };
    let Some(pos) = doc.detach(id) else {
        return;
    };
    for (offset, fragment) in content.iter().enumerate() {
        doc.insert_fragment(parent, pos + offset, fragment);
    }
}

/// Support for the `xpointer(<path>)` scheme
fn select_pointer(
    included: &Document,
    href: &str,
    pointer: &str,
) -> Result<Vec<Fragment>, IncludeError> {
    let invalid = || IncludeError::InvalidPointer {
        href: href.to_string(),
        pointer: pointer.to_string(),
    };

    let expression = pointer
        .trim()
        .strip_prefix("xpointer(")
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(invalid)?;
    let path = XPath::parse(expression).map_err(|_| invalid())?;

    Ok(path
        .select(included)
        .into_iter()
        .map(|id| included.to_fragment(id))
        .collect())
}

/// Whether `id` is an XInclude element with the given local name
fn is_xinclude(doc: &Document, id: NodeId, local: &str) -> bool {
    if doc.is_document(id) {
        return false;
    }

    let (prefix, name) = match doc.name(id).split_once(':') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, doc.name(id)),
    };
    if name != local {
        return false;
    }

    let declaration = match prefix {
        Some(prefix) => format!("xmlns:{}", prefix),
        None => "xmlns".to_string(),
    };
    namespace_in_scope(doc, id, &declaration) == Some(XINCLUDE_NAMESPACE)
}

/// Nearest declaration of `declaration` on `id` or its ancestors
fn namespace_in_scope<'d>(doc: &'d Document, id: NodeId, declaration: &str) -> Option<&'d str> {
    let mut current = Some(id);
    while let Some(node) = current {
        if let Some(uri) = doc.attribute(node, declaration) {
            return Some(uri);
        }
        current = doc.parent(node);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleurmod_common::MockFileSystem;
    use fleurmod_xml::{parse, Serializer};

    const XI: &str = r#"xmlns:xi="http://www.w3.org/2001/XInclude""#;

    fn compact(doc: &Document) -> String {
        Serializer::compact().serialize(doc)
    }

    #[test]
    fn test_include_replaced_by_target_root() {
        let fs = MockFileSystem::new()
            .with_file("/calc/sym.xml", "<symmetryOperations><symOp/></symmetryOperations>");
        let doc =
            parse(&format!(r#"<a><cell><xi:include {} href="sym.xml"/></cell></a>"#, XI)).unwrap();

        let resolved = IncludeResolver::new(&fs, "/calc").resolve(&doc).unwrap();
        assert_eq!(
            compact(&resolved),
            "<a><cell><symmetryOperations><symOp/></symmetryOperations></cell></a>"
        );
        // Original untouched
        assert!(compact(&doc).contains("xi:include"));
    }

    #[test]
    fn test_fallback_used_when_target_missing() {
        let fs = MockFileSystem::new();
        let doc = parse(&format!(
            r#"<a {}><xi:include href="relax.xml"><xi:fallback><none/></xi:fallback></xi:include><b/></a>"#,
            XI
        ))
        .unwrap();

        let resolved = IncludeResolver::new(&fs, "/calc").resolve(&doc).unwrap();
        assert_eq!(compact(&resolved), format!("<a {}><none/><b/></a>", XI));
    }

    #[test]
    fn test_missing_target_without_fallback() {
        let fs = MockFileSystem::new();
        let doc = parse(&format!(r#"<a><xi:include {} href="sym.xml"/></a>"#, XI)).unwrap();

        let result = IncludeResolver::new(&fs, "/calc").resolve(&doc);
        assert!(matches!(result, Err(IncludeError::MissingTarget { .. })));
    }

    #[test]
    fn test_include_cycle_detected() {
        let fs = MockFileSystem::new()
            .with_file("/c/one.xml", format!(r#"<one><xi:include {} href="two.xml"/></one>"#, XI))
            .with_file("/c/two.xml", format!(r#"<two><xi:include {} href="one.xml"/></two>"#, XI));
        let doc = parse(&format!(r#"<a><xi:include {} href="one.xml"/></a>"#, XI)).unwrap();

        let result = IncludeResolver::new(&fs, "/c").resolve(&doc);
        assert!(matches!(result, Err(IncludeError::Cycle { .. })));
    }

    #[test]
    fn test_xpointer_selects_children() {
        let fs = MockFileSystem::new()
            .with_file("/c/kpts.xml", "<kPointLists><k n='1'/><k n='2'/></kPointLists>");
        let doc = parse(&format!(
            r#"<a><xi:include {} href="kpts.xml" xpointer="xpointer(/kPointLists/*)"/></a>"#,
            XI
        ))
        .unwrap();

        let resolved = IncludeResolver::new(&fs, "/c").resolve(&doc).unwrap();
        assert_eq!(compact(&resolved), r#"<a><k n="1"/><k n="2"/></a>"#);
    }

    #[test]
    fn test_include_targets() {
        let doc = parse(&format!(
            r#"<a {XI}><xi:include href="sym.xml"/><b><xi:include href="sym.xml"/><xi:include href="kpts.xml"/></b></a>"#
        ))
        .unwrap();
        assert_eq!(include_targets(&doc), vec!["sym.xml", "kpts.xml"]);
    }

    #[test]
    fn test_other_namespaces_left_alone() {
        let fs = MockFileSystem::new();
        let doc = parse(r#"<a xmlns:x="urn:other"><x:include href="sym.xml"/></a>"#).unwrap();
        let resolved = IncludeResolver::new(&fs, "/").resolve(&doc).unwrap();
        assert_eq!(resolved, doc);
    }
}
