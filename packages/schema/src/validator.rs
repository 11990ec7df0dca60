use crate::error::SchemaValidationError;
use crate::schema::{ElementRule, Schema};
use crate::violation::Violation;
use fleurmod_xml::{Document, NodeId};

/// Validate a document against a schema, collecting every violation
///
/// Includes must already be resolved; namespace declarations
/// (`xmlns`, `xmlns:*`) are always accepted.
pub fn validate(schema: &Schema, doc: &Document) -> Result<(), SchemaValidationError> {
    let mut violations = Vec::new();

    match doc.root_element() {
        None => violations.push(Violation::new("/", "root", "document has no root element")),
        Some(root) if doc.name(root) != schema.root => violations.push(Violation::new(
            doc.display_path(root),
            "root",
            format!("expected root element '{}'", schema.root),
        )),
        Some(root) => {
            if let Some(rule) = schema.element(&schema.root) {
                validate_element(schema, doc, root, rule, &mut violations);
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        tracing::debug!(violations = violations.len(), "Schema validation failed");
        Err(SchemaValidationError { violations })
    }
}

/// Check one element and recurse into its children
fn validate_element(
    schema: &Schema,
    doc: &Document,
    id: NodeId,
    rule: &ElementRule,
    violations: &mut Vec<Violation>,
) {
    check_attributes(doc, id, rule, violations);
    check_text(doc, id, rule, violations);

    let mut counts = vec![0u32; rule.children.len()];
    let mut last_index = 0;

    for child in doc.children(id) {
        let name = doc.name(*child);
        match rule.child(name) {
            Some((index, _)) => {
                counts[index] += 1;
                if rule.ordered && index < last_index {
                    violations.push(Violation::new(
                        doc.display_path(*child),
                        "order",
                        format!("element '{}' is out of order", name),
                    ));
                }
                last_index = last_index.max(index);

                // Elements without a rule of their own are unconstrained
                if let Some(child_rule) = schema.element(name) {
                    validate_element(schema, doc, *child, child_rule, violations);
                }
            }
            None if rule.open => {}
            None => violations.push(Violation::new(
                doc.display_path(*child),
                "unknown-element",
                format!("unexpected element '{}' in '{}'", name, doc.name(id)),
            )),
        }
    }

    for (child_rule, count) in rule.children.iter().zip(counts) {
        if count < child_rule.min {
            violations.push(Violation::new(
                doc.display_path(id),
                "cardinality",
                format!(
                    "expected at least {} '{}' element(s), found {}",
                    child_rule.min, child_rule.name, count
                ),
            ));
        }
        if let Some(max) = child_rule.max {
            if count > max {
                violations.push(Violation::new(
                    doc.display_path(id),
                    "cardinality",
                    format!(
                        "expected at most {} '{}' element(s), found {}",
                        max, child_rule.name, count
                    ),
                ));
            }
        }
    }
}

fn check_attributes(
    doc: &Document,
    id: NodeId,
    rule: &ElementRule,
    violations: &mut Vec<Violation>,
) {
    for attr in doc.attributes(id) {
        if attr.name == "xmlns" || attr.name.starts_with("xmlns:") {
            continue;
        }

        match rule.attributes.get(&attr.name) {
            Some(attr_rule) => {
                if !attr_rule.value_type.accepts(&attr.value, &attr_rule.values) {
                    violations.push(Violation::new(
                        doc.display_path(id),
                        "attribute-type",
                        format!(
                            "attribute '{}' = '{}' is not {}",
                            attr.name,
                            attr.value,
                            attr_rule.value_type.describe()
                        ),
                    ));
                }
            }
            None if rule.open => {}
            None => violations.push(Violation::new(
                doc.display_path(id),
                "unknown-attribute",
                format!("unexpected attribute '{}'", attr.name),
            )),
        }
    }

    for (name, attr_rule) in &rule.attributes {
        if attr_rule.required && doc.attribute(id, name).is_none() {
            violations.push(Violation::new(
                doc.display_path(id),
                "missing-attribute",
                format!("missing required attribute '{}'", name),
            ));
        }
    }
}

fn check_text(doc: &Document, id: NodeId, rule: &ElementRule, violations: &mut Vec<Violation>) {
    let Some(text) = doc.text(id) else {
        return;
    };

    match rule.text {
        Some(value_type) => {
            if !value_type.accepts(text, &[]) {
                violations.push(Violation::new(
                    doc.display_path(id),
                    "text",
                    format!("text '{}' is not {}", text.trim(), value_type.describe()),
                ));
            }
        }
        None if rule.open => {}
        None => violations.push(Violation::new(
            doc.display_path(id),
            "text",
            format!("element '{}' takes no text", doc.name(id)),
        )),
    }
}
