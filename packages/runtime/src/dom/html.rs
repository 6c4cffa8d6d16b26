use super::{Document, NodeId, NodeKind};
use petal_parser::{escape_text, is_raw_text_element, is_void_element, write_open_tag};

impl Document {
    /// Markup of the node's children
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw = self
            .tag_name(id)
            .is_some_and(|tag| is_raw_text_element(&tag));
        for child in self.children(id) {
            self.write_node(&mut out, child, raw);
        }
        out
    }

    /// Markup of the node itself, including its children
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(&mut out, id, false);
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId, raw_text: bool) {
        match self.kind(id) {
            NodeKind::Element(tag) => {
                let attributes = self.attributes(id);
                write_open_tag(
                    out,
                    &tag,
                    attributes.iter().map(|(n, v)| (n.as_str(), v.as_str())),
                );
                if is_void_element(&tag) {
                    return;
                }
                out.push_str(&self.inner_html(id));
                out.push_str("</");
                out.push_str(&tag);
                out.push('>');
            }
            NodeKind::Text => {
                let text = self.text(id);
                if raw_text {
                    out.push_str(&text);
                } else {
                    out.push_str(&escape_text(&text));
                }
            }
            NodeKind::Comment => {
                out.push_str("<!--");
                out.push_str(&self.text(id));
                out.push_str("-->");
            }
            NodeKind::Document | NodeKind::Fragment => {
                for child in self.children(id) {
                    self.write_node(out, child, raw_text);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outer_html_roundtrip() {
        let source = r#"<ul id="l"><li>a &amp; b</li><!--v-if--><br></ul>"#;
        let doc = Document::parse(source).unwrap();
        let ul = doc.first_child(doc.body()).unwrap();
        assert_eq!(doc.outer_html(ul), source);
    }

    #[test]
    fn test_empty_text_nodes_render_nothing() {
        let doc = Document::new();
        let p = doc.create_element("p");
        let marker = doc.create_text("");
        doc.append_child(p, marker).unwrap();
        doc.append_child(doc.body(), p).unwrap();
        assert_eq!(doc.inner_html(doc.body()), "<p></p>");
    }
}
