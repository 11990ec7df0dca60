use crate::tree::{Document, Fragment, NodeId};

/// Serializer converts a document tree back to XML text
///
/// Output is a pure function of the tree: attribute order is the stored
/// order, indentation is fixed, and empty elements are self-closed. Two
/// equal trees always produce the same bytes, which is what replay and
/// provenance caching rely on.
pub struct Serializer {
    indent_string: String,
    pretty: bool,
    declaration: bool,
}

impl Serializer {
    /// Pretty output with an XML declaration and two-space indentation
    pub fn new() -> Self {
        Self {
            indent_string: "  ".to_string(),
            pretty: true,
            declaration: true,
        }
    }

    pub fn with_indent(indent: &str) -> Self {
        Self {
            indent_string: indent.to_string(),
            ..Self::new()
        }
    }

    /// Single-line output without a declaration
    pub fn compact() -> Self {
        Self {
            indent_string: String::new(),
            pretty: false,
            declaration: false,
        }
    }

    /// Serialize a whole document
    pub fn serialize(&self, doc: &Document) -> String {
        let mut output = String::new();

        if self.declaration {
            output.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
            if self.pretty {
                output.push('\n');
            }
        }

        if let Some(root) = doc.root_element() {
            self.write_element(&doc.to_fragment(root), 0, &mut output);
        }

        output
    }

    /// Serialize the subtree rooted at `id` (no declaration)
    pub fn serialize_node(&self, doc: &Document, id: NodeId) -> String {
        let mut output = String::new();
        self.write_element(&doc.to_fragment(id), 0, &mut output);
        output
    }

    pub fn serialize_fragment(&self, fragment: &Fragment) -> String {
        let mut output = String::new();
        self.write_element(fragment, 0, &mut output);
        output
    }

    fn write_element(&self, element: &Fragment, depth: usize, output: &mut String) {
        self.write_indent(depth, output);
        output.push('<');
        output.push_str(&element.name);

        for attr in &element.attributes {
            output.push(' ');
            output.push_str(&attr.name);
            output.push_str("=\"");
            output.push_str(&escape_attribute(&attr.value));
            output.push('"');
        }

        if element.children.is_empty() && element.text.is_none() {
            output.push_str("/>");
            self.write_newline(output);
            return;
        }

        output.push('>');
        if let Some(text) = &element.text {
            output.push_str(&escape_text(text));
        }

        if !element.children.is_empty() {
            self.write_newline(output);
            for child in &element.children {
                self.write_element(child, depth + 1, output);
            }
            self.write_indent(depth, output);
        }

        output.push_str("</");
        output.push_str(&element.name);
        output.push('>');
        self.write_newline(output);
    }

    fn write_indent(&self, depth: usize, output: &mut String) {
        if self.pretty {
            for _ in 0..depth {
                output.push_str(&self.indent_string);
            }
        }
    }

    fn write_newline(&self, output: &mut String) {
        if self.pretty {
            output.push('\n');
        }
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Pretty-print a document with the default serializer
pub fn serialize(doc: &Document) -> String {
    Serializer::new().serialize(doc)
}

fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\t' => out.push_str("&#9;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_compact_output() {
        let doc = parse(r#"<a x="1"><b>text</b><c/></a>"#).unwrap();
        let output = Serializer::compact().serialize(&doc);
        assert_eq!(output, r#"<a x="1"><b>text</b><c/></a>"#);
    }

    #[test]
    fn test_pretty_output() {
        let doc = parse(r#"<a x="1"><b>text</b><c><d/></c></a>"#).unwrap();
        let output = serialize(&doc);

        let expected = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
                        <a x=\"1\">\n\
                        \x20\x20<b>text</b>\n\
                        \x20\x20<c>\n\
                        \x20\x20\x20\x20<d/>\n\
                        \x20\x20</c>\n\
                        </a>\n";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_escaping_round_trips() {
        let source = r#"<a v="&quot;q&quot; &amp; &lt;">1 &lt; 2</a>"#;
        let doc = parse(source).unwrap();
        let output = Serializer::compact().serialize(&doc);
        let reparsed = parse(&output).unwrap();
        assert_eq!(doc, reparsed);
    }

    #[test]
    fn test_serialize_is_deterministic() {
        let doc = parse(r#"<a z="1" y="2" x="3"><b/><b/></a>"#).unwrap();
        assert_eq!(serialize(&doc), serialize(&doc.clone()));
        // Attribute order is kept as written
        assert!(serialize(&doc).contains(r#"<a z="1" y="2" x="3">"#));
    }
}
