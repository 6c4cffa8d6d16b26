use crate::ast::{MarkupAttribute, MarkupDocument, MarkupNode, Span};
use crate::error::{ParseError, ParseResult};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea"];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Parse an HTML fragment into a tree.
///
/// The grammar is forgiving in the way browsers are: a stray closing tag is
/// ignored, an unclosed element ends at its parent's close or at EOF, and
/// `<!DOCTYPE>` is skipped. Unterminated tags and comments are errors.
pub fn parse_markup(source: &str) -> ParseResult<MarkupDocument> {
    let mut parser = MarkupParser { source, pos: 0 };
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut roots = Vec::new();

    while parser.pos < source.len() {
        let node = if parser.starts_with("<!--") {
            Some(parser.parse_comment()?)
        } else if parser.starts_with("<!") {
            parser.skip_declaration()?;
            None
        } else if parser.starts_with("</") {
            let (tag, end) = parser.parse_closing_tag()?;
            close_element(&mut stack, &mut roots, &tag, end);
            None
        } else if parser.at_tag_open() {
            let (element, self_closing) = parser.parse_opening_tag()?;
            if self_closing || is_void_element(&element.tag) {
                Some(element.finish(parser.pos))
            } else if RAW_TEXT_ELEMENTS.contains(&element.tag.as_str()) {
                Some(parser.parse_raw_text(element)?)
            } else {
                stack.push(element);
                None
            }
        } else {
            Some(parser.parse_text())
        };

        if let Some(node) = node {
            push_node(&mut stack, &mut roots, node);
        }
    }

    while let Some(open) = stack.pop() {
        let node = open.finish(source.len());
        push_node(&mut stack, &mut roots, node);
    }

    Ok(MarkupDocument { nodes: roots })
}

struct OpenElement {
    tag: String,
    attributes: Vec<MarkupAttribute>,
    children: Vec<MarkupNode>,
    start: usize,
}

impl OpenElement {
    fn finish(self, end: usize) -> MarkupNode {
        MarkupNode::Element {
            tag: self.tag,
            attributes: self.attributes,
            children: self.children,
            span: Span::new(self.start, end),
        }
    }
}

fn push_node(stack: &mut [OpenElement], roots: &mut Vec<MarkupNode>, node: MarkupNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn close_element(stack: &mut Vec<OpenElement>, roots: &mut Vec<MarkupNode>, tag: &str, end: usize) {
    if !stack.iter().any(|open| open.tag == tag) {
        return;
    }
    while let Some(open) = stack.pop() {
        let matched = open.tag == tag;
        let node = open.finish(end);
        push_node(stack, roots, node);
        if matched {
            break;
        }
    }
}

struct MarkupParser<'src> {
    source: &'src str,
    pos: usize,
}

impl<'src> MarkupParser<'src> {
    fn rest(&self) -> &'src str {
        &self.source[self.pos..]
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_tag_open(&self) -> bool {
        let mut chars = self.rest().chars();
        chars.next() == Some('<') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.source.len() - trimmed.len();
    }

    fn parse_comment(&mut self) -> ParseResult<MarkupNode> {
        let start = self.pos;
        let body_start = start + 4;
        let close = self.source[body_start..]
            .find("-->")
            .ok_or_else(|| ParseError::unexpected_eof(self.source.len(), "'-->'"))?;
        let content = self.source[body_start..body_start + close].to_string();
        self.pos = body_start + close + 3;
        Ok(MarkupNode::Comment {
            content,
            span: Span::new(start, self.pos),
        })
    }

    fn skip_declaration(&mut self) -> ParseResult<()> {
        let close = self
            .rest()
            .find('>')
            .ok_or_else(|| ParseError::unexpected_eof(self.source.len(), "'>'"))?;
        self.pos += close + 1;
        Ok(())
    }

    fn parse_text(&mut self) -> MarkupNode {
        let start = self.pos;
        // Skip the first char so a lone '<' that opens nothing is kept as text
        let first_len = self.peek_char().map(char::len_utf8).unwrap_or(1);
        let search_from = start + first_len;
        let end = self.source[search_from..]
            .find('<')
            .map(|offset| search_from + offset)
            .unwrap_or(self.source.len());
        self.pos = end;
        MarkupNode::Text {
            content: decode_entities(&self.source[start..end]),
            span: Span::new(start, end),
        }
    }

    fn parse_tag_name(&mut self) -> String {
        let name_len = self
            .rest()
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(self.rest().len());
        let name = self.rest()[..name_len].to_ascii_lowercase();
        self.pos += name_len;
        name
    }

    fn parse_closing_tag(&mut self) -> ParseResult<(String, usize)> {
        self.pos += 2;
        let tag = self.parse_tag_name();
        let close = self
            .rest()
            .find('>')
            .ok_or_else(|| ParseError::unexpected_eof(self.source.len(), "'>'"))?;
        self.pos += close + 1;
        Ok((tag, self.pos))
    }

    fn parse_opening_tag(&mut self) -> ParseResult<(OpenElement, bool)> {
        let start = self.pos;
        self.pos += 1;
        let tag = self.parse_tag_name();
        let mut attributes = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek_char() {
                None => {
                    return Err(ParseError::unexpected_eof(
                        self.source.len(),
                        format!("'>' closing <{}>", tag),
                    ))
                }
                Some('>') => {
                    self.pos += 1;
                    return Ok((
                        OpenElement {
                            tag,
                            attributes,
                            children: Vec::new(),
                            start,
                        },
                        false,
                    ));
                }
                Some('/') if self.starts_with("/>") => {
                    self.pos += 2;
                    return Ok((
                        OpenElement {
                            tag,
                            attributes,
                            children: Vec::new(),
                            start,
                        },
                        true,
                    ));
                }
                Some('/') => self.pos += 1,
                Some(_) => attributes.push(self.parse_attribute()?),
            }
        }
    }

    /// Attribute names accept anything but whitespace, quotes, `>`, `/` and
    /// `=`, so `@click.prevent`, `:class` and `v-on:[x]` all pass through
    fn parse_attribute(&mut self) -> ParseResult<MarkupAttribute> {
        let name_start = self.pos;
        let name_len = self
            .rest()
            .find(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '>' | '/' | '='))
            .unwrap_or(self.rest().len());
        if name_len == 0 {
            let ch_len = self.peek_char().map(char::len_utf8).unwrap_or(1);
            return Err(ParseError::invalid_syntax(
                name_start..name_start + ch_len,
                "unexpected character in tag",
            ));
        }
        let name = self.rest()[..name_len].to_string();
        self.pos += name_len;

        let after_name = self.pos;
        self.skip_whitespace();
        if self.peek_char() != Some('=') {
            self.pos = after_name;
            return Ok(MarkupAttribute {
                name,
                value: String::new(),
                value_span: Span::new(after_name, after_name),
            });
        }
        self.pos += 1;
        self.skip_whitespace();

        let source = self.source;
        let (raw, value_start) = match self.peek_char() {
            Some(quote @ ('"' | '\'')) => {
                let value_start = self.pos + 1;
                let close = source[value_start..]
                    .find(quote)
                    .ok_or_else(|| ParseError::unexpected_eof(source.len(), quote.to_string()))?;
                self.pos = value_start + close + 1;
                (&source[value_start..value_start + close], value_start)
            }
            _ => {
                let value_start = self.pos;
                let len = self
                    .rest()
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(self.rest().len());
                self.pos += len;
                (&source[value_start..value_start + len], value_start)
            }
        };

        Ok(MarkupAttribute {
            name,
            value: decode_entities(raw),
            value_span: Span::new(value_start, value_start + raw.len()),
        })
    }

    /// `<script>`, `<style>` and `<textarea>` hold unparsed text up to their
    /// closing tag
    fn parse_raw_text(&mut self, mut element: OpenElement) -> ParseResult<MarkupNode> {
        let closing = format!("</{}", element.tag);
        let text_start = self.pos;
        let offset = self.rest().to_ascii_lowercase().find(&closing).ok_or_else(|| {
            ParseError::unexpected_eof(self.source.len(), format!("'{}>'", closing))
        })?;
        let text_end = text_start + offset;
        if text_end > text_start {
            let raw = &self.source[text_start..text_end];
            let content = if element.tag == "textarea" {
                decode_entities(raw)
            } else {
                raw.to_string()
            };
            element.children.push(MarkupNode::Text {
                content,
                span: Span::new(text_start, text_end),
            });
        }
        self.pos = text_end;
        let (_, end) = self.parse_closing_tag()?;
        Ok(element.finish(end))
    }
}

/// Decode the character references templates commonly use
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                    u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
                }
                _ if entity.starts_with('#') => {
                    entity[1..].parse::<u32>().ok().and_then(char::from_u32)
                }
                _ => None,
            };
            ch.map(|c| (c, semi))
        });

        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &MarkupNode) -> (&str, &[MarkupAttribute], &[MarkupNode]) {
        match node {
            MarkupNode::Element {
                tag,
                attributes,
                children,
                ..
            } => (tag.as_str(), attributes.as_slice(), children.as_slice()),
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_void_and_self_closing() {
        let doc = parse_markup(r#"<div><input v-model="x"><br/><span>a</span></div>"#).unwrap();
        let (tag, _, children) = element(&doc.nodes[0]);
        assert_eq!(tag, "div");
        assert_eq!(children.len(), 3);
        assert_eq!(element(&children[0]).0, "input");
        assert_eq!(element(&children[1]).0, "br");
    }

    #[test]
    fn test_directive_attribute_names() {
        let doc = parse_markup(r#"<button @click.prevent="go()" :class="{a: b}" disabled>x</button>"#)
            .unwrap();
        let (_, attrs, _) = element(&doc.nodes[0]);
        let names: Vec<_> = attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["@click.prevent", ":class", "disabled"]);
        assert_eq!(attrs[1].value, "{a: b}");
        assert_eq!(attrs[2].value, "");
    }

    #[test]
    fn test_value_span_points_into_source() {
        let source = r#"<p v-if="ok">y</p>"#;
        let doc = parse_markup(source).unwrap();
        let (_, attrs, _) = element(&doc.nodes[0]);
        let span = attrs[0].value_span;
        assert_eq!(&source[span.start..span.end], "ok");
    }

    #[test]
    fn test_lenient_closing() {
        let doc = parse_markup("<ul><li>a<li>b</ul></p>tail").unwrap();
        assert_eq!(doc.nodes.len(), 2);
        let (_, _, items) = element(&doc.nodes[0]);
        // second <li> nests inside the first, both close at </ul>
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_raw_text_and_entities() {
        let doc = parse_markup("<script>if (a < b) {}</script><p>&lt;b&gt; &amp; &#65;</p>").unwrap();
        let (_, _, script) = element(&doc.nodes[0]);
        assert_eq!(
            script[0],
            MarkupNode::Text {
                content: "if (a < b) {}".to_string(),
                span: Span::new(8, 21),
            }
        );
        let (_, _, p) = element(&doc.nodes[1]);
        match &p[0] {
            MarkupNode::Text { content, .. } => assert_eq!(content, "<b> & A"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_comment_is_error() {
        assert!(parse_markup("<div><!-- oops</div>").is_err());
    }
}
