use super::{Document, NodeId};

/// One compound selector: `tag#id.class[attr][attr=value]`
#[derive(Debug, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

/// Descendant-combinator chain, outermost first
#[derive(Debug, PartialEq)]
struct Selector(Vec<Compound>);

fn parse_compound(source: &str) -> Option<Compound> {
    let mut compound = Compound::default();
    let mut rest = source;

    let tag_len = rest
        .find(['#', '.', '['])
        .unwrap_or(rest.len());
    if tag_len > 0 {
        let tag = &rest[..tag_len];
        if tag != "*" {
            compound.tag = Some(tag.to_ascii_lowercase());
        }
        rest = &rest[tag_len..];
    }

    while let Some(first) = rest.chars().next() {
        match first {
            '#' | '.' => {
                let body = &rest[1..];
                let len = body.find(['#', '.', '[']).unwrap_or(body.len());
                if len == 0 {
                    return None;
                }
                let name = body[..len].to_string();
                if first == '#' {
                    compound.id = Some(name);
                } else {
                    compound.classes.push(name);
                }
                rest = &body[len..];
            }
            '[' => {
                let close = rest.find(']')?;
                let inner = &rest[1..close];
                let attribute = match inner.split_once('=') {
                    Some((name, value)) => (
                        name.trim().to_string(),
                        Some(value.trim().trim_matches(['"', '\'']).to_string()),
                    ),
                    None => (inner.trim().to_string(), None),
                };
                compound.attributes.push(attribute);
                rest = &rest[close + 1..];
            }
            _ => return None,
        }
    }
    Some(compound)
}

fn parse_selector(source: &str) -> Option<Selector> {
    let parts = source
        .split_whitespace()
        .map(parse_compound)
        .collect::<Option<Vec<_>>>()?;
    (!parts.is_empty()).then_some(Selector(parts))
}

impl Document {
    fn matches_compound(&self, node: NodeId, compound: &Compound) -> bool {
        let Some(tag) = self.tag_name(node) else {
            return false;
        };
        if compound.tag.as_ref().is_some_and(|t| *t != tag) {
            return false;
        }
        if let Some(id) = &compound.id {
            if self.get_attribute(node, "id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !compound.classes.is_empty() {
            let class = self.get_attribute(node, "class").unwrap_or_default();
            let present: Vec<&str> = class.split_whitespace().collect();
            if !compound.classes.iter().all(|c| present.contains(&c.as_str())) {
                return false;
            }
        }
        compound.attributes.iter().all(|(name, value)| {
            match (self.get_attribute(node, name), value) {
                (Some(actual), Some(expected)) => actual == *expected,
                (Some(_), None) => true,
                (None, _) => false,
            }
        })
    }

    fn matches_selector(&self, node: NodeId, selector: &Selector) -> bool {
        let Some((last, ancestors)) = selector.0.split_last() else {
            return false;
        };
        if !self.matches_compound(node, last) {
            return false;
        }
        let mut remaining = ancestors.iter().rev().peekable();
        let mut current = self.parent(node);
        while let Some(compound) = remaining.peek() {
            let Some(candidate) = current else {
                return false;
            };
            if self.matches_compound(candidate, compound) {
                remaining.next();
            }
            current = self.parent(candidate);
        }
        true
    }

    /// Whether an element matches a (possibly comma-separated) selector list
    pub fn matches(&self, node: NodeId, selectors: &str) -> bool {
        selectors
            .split(',')
            .filter_map(|s| parse_selector(s.trim()))
            .any(|selector| self.matches_selector(node, &selector))
    }

    /// Matching descendants of `scope` in document order
    pub fn query_selector_all(&self, scope: NodeId, selectors: &str) -> Vec<NodeId> {
        let parsed: Vec<Selector> = selectors
            .split(',')
            .filter_map(|s| parse_selector(s.trim()))
            .collect();
        self.descendants(scope)
            .into_iter()
            .filter(|node| parsed.iter().any(|s| self.matches_selector(*node, s)))
            .collect()
    }

    pub fn query_selector(&self, scope: NodeId, selectors: &str) -> Option<NodeId> {
        self.query_selector_all(scope, selectors).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compound() {
        let compound = parse_compound("li.item.done[data-id=\"3\"]").unwrap();
        assert_eq!(compound.tag.as_deref(), Some("li"));
        assert_eq!(compound.classes, vec!["item", "done"]);
        assert_eq!(
            compound.attributes,
            vec![("data-id".to_string(), Some("3".to_string()))]
        );
        assert!(parse_compound("a..b").is_none());
    }

    #[test]
    fn test_query_selectors() {
        let doc = Document::parse(
            r#"<div id="app" v-scope><ul><li class="a">1</li><li class="a b">2</li></ul></div><p v-scope></p>"#,
        )
        .unwrap();
        let body = doc.body();
        assert_eq!(doc.query_selector_all(body, "li.a").len(), 2);
        assert_eq!(doc.query_selector_all(body, ".b").len(), 1);
        assert_eq!(doc.query_selector_all(body, "[v-scope]").len(), 2);
        assert_eq!(doc.query_selector_all(body, "#app li").len(), 2);
        assert_eq!(doc.query_selector_all(body, "p li, ul").len(), 1);
        assert!(doc.query_selector(body, "span").is_none());
    }
}
