use crate::ast::*;
use crate::markup::is_void_element;
use std::fmt::Write;

/// Serializer converts a markup tree back to HTML
///
/// Attribute order and text are preserved; attribute values are always
/// double-quoted. Whitespace inside tags is normalised.
pub struct Serializer {
    output: String,
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    pub fn serialize(mut self, doc: &MarkupDocument) -> String {
        for node in &doc.nodes {
            self.serialize_node(node, false);
        }
        self.output
    }

    fn serialize_node(&mut self, node: &MarkupNode, raw_text: bool) {
        match node {
            MarkupNode::Element {
                tag,
                attributes,
                children,
                ..
            } => {
                write_open_tag(
                    &mut self.output,
                    tag,
                    attributes.iter().map(|a| (a.name.as_str(), a.value.as_str())),
                );
                if is_void_element(tag) {
                    return;
                }
                let raw = is_raw_text_element(tag);
                for child in children {
                    self.serialize_node(child, raw);
                }
                let _ = write!(self.output, "</{}>", tag);
            }
            MarkupNode::Text { content, .. } => {
                if raw_text {
                    self.output.push_str(content);
                } else {
                    self.output.push_str(&escape_text(content));
                }
            }
            MarkupNode::Comment { content, .. } => {
                let _ = write!(self.output, "<!--{}-->", content);
            }
        }
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to serialize a markup document
pub fn serialize(doc: &MarkupDocument) -> String {
    Serializer::new().serialize(doc)
}

/// `<tag a="b" flag>`; an empty value is written as a bare attribute name
pub fn write_open_tag<'a>(
    out: &mut String,
    tag: &str,
    attributes: impl IntoIterator<Item = (&'a str, &'a str)>,
) {
    out.push('<');
    out.push_str(tag);
    for (name, value) in attributes {
        out.push(' ');
        out.push_str(name);
        if !value.is_empty() {
            let _ = write!(out, "=\"{}\"", escape_attribute(value));
        }
    }
    out.push('>');
}

pub fn is_raw_text_element(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
    out
}

pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse_markup;

    #[test]
    fn test_roundtrip_keeps_structure() {
        let source = r#"<ul id="list"><li class="a">one &amp; two</li><li>x</li></ul><br><!--v-if-->"#;
        let doc = parse_markup(source).unwrap();
        assert_eq!(serialize(&doc), source);
    }

    #[test]
    fn test_bare_attributes_and_quotes() {
        let doc = parse_markup(r#"<input disabled value='say "hi"'>"#).unwrap();
        assert_eq!(
            serialize(&doc),
            r#"<input disabled value="say &quot;hi&quot;">"#
        );
    }

    #[test]
    fn test_script_text_is_not_escaped() {
        let doc = parse_markup("<script>a < b && c</script>").unwrap();
        assert_eq!(serialize(&doc), "<script>a < b && c</script>");
    }
}
