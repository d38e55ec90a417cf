//! Formatting-insensitive comparison of XML trees.
//!
//! Two trees are structurally equal when their tag names, attribute sets,
//! trimmed leaf text and ordered children match. Attribute order and
//! whitespace between elements never matter.

use crate::error::Result;
use crate::node::XmlNode;

/// Normalize a tree for comparison.
///
/// Attributes are sorted by name, text is trimmed, whitespace-only text is
/// dropped, and text on elements that have children is discarded.
pub fn normalize(node: &XmlNode) -> XmlNode {
    let mut attributes = node.attributes.clone();
    attributes.sort();

    let children: Vec<XmlNode> = node.children.iter().map(normalize).collect();
    let text = if children.is_empty() {
        node.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    } else {
        None
    };

    XmlNode {
        name: node.name.clone(),
        attributes,
        text,
        children,
    }
}

/// Canonical XML text of a tree, used in assertion diagnostics.
pub fn canonical_string(node: &XmlNode) -> Result<String> {
    normalize(node).to_xml()
}

/// Full structural equality of two trees.
pub fn structurally_equal(a: &XmlNode, b: &XmlNode) -> bool {
    normalize(a) == normalize(b)
}

/// True if any element of `haystack`, at any depth, equals `needle`.
pub fn contains(haystack: &XmlNode, needle: &XmlNode) -> bool {
    let needle = normalize(needle);
    normalize(haystack).descendants().any(|node| *node == needle)
}

/// True if any element of `haystack` has the element-name shape of `needle`.
///
/// Shape means same tag name and the same number and order of element
/// children, recursively. Attributes and text are ignored.
pub fn contains_structure(haystack: &XmlNode, needle: &XmlNode) -> bool {
    haystack.descendants().any(|node| same_shape(node, needle))
}

fn same_shape(a: &XmlNode, b: &XmlNode) -> bool {
    a.name == b.name
        && a.children.len() == b.children.len()
        && a
            .children
            .iter()
            .zip(&b.children)
            .all(|(x, y)| same_shape(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> XmlNode {
        XmlNode::parse(xml).unwrap()
    }

    #[test]
    fn test_attribute_order_is_ignored() {
        let a = parse(r#"<a a2="2" a1="1">123</a>"#);
        let b = parse(r#"<a    a1="1"      a2="2" >123</a>"#);
        assert!(structurally_equal(&a, &b));
        assert_eq!(canonical_string(&a).unwrap(), r#"<a a1="1" a2="2">123</a>"#);
    }

    #[test]
    fn test_pretty_printing_is_ignored() {
        let compact = parse("<doc><a><b>1</b></a><c/></doc>");
        let pretty = parse("<doc>\n  <a>\n    <b> 1 </b>\n  </a>\n  <c>   </c>\n</doc>");
        assert!(structurally_equal(&compact, &pretty));
    }

    #[test]
    fn test_child_order_is_significant() {
        let a = parse("<doc><x/><y/></doc>");
        let b = parse("<doc><y/><x/></doc>");
        assert!(!structurally_equal(&a, &b));
    }

    #[test]
    fn test_extra_attribute_or_child_breaks_equality() {
        let base = parse(r#"<doc><a a1="1">123</a></doc>"#);
        let extra_attr = parse(r#"<doc><a a1="1" a2="2">123</a></doc>"#);
        let extra_child = parse(r#"<doc><a a1="1">123</a><b/></doc>"#);
        assert!(!structurally_equal(&base, &extra_attr));
        assert!(!structurally_equal(&base, &extra_child));
    }

    #[test]
    fn test_internal_whitespace_is_kept() {
        let a = parse("<a>1 2</a>");
        let b = parse("<a>1  2</a>");
        assert!(!structurally_equal(&a, &b));
    }

    #[test]
    fn test_text_beside_children_is_ignored() {
        let a = parse("<a>noise<b/></a>");
        let b = parse("<a><b/></a>");
        assert!(structurally_equal(&a, &b));
    }

    #[test]
    fn test_contains_at_any_depth() {
        let doc = parse(r#"<doc><wrap><a a2="2" a1="1">123</a></wrap></doc>"#);
        assert!(contains(&doc, &parse(r#"<a a1="1" a2="2">123</a>"#)));
        assert!(contains(&doc, &doc));
        assert!(!contains(&doc, &parse(r#"<a a1="1">123</a>"#)));
        assert!(!contains(&doc, &parse(r#"<a a1="1" a2="2">124</a>"#)));
    }

    #[test]
    fn test_contains_structure_ignores_values() {
        let doc = parse(r#"<doc><user id="7"><name>Ann</name><age>3</age></user></doc>"#);
        assert!(contains_structure(&doc, &parse("<user><name/><age/></user>")));
        assert!(!contains_structure(&doc, &parse("<user><name/></user>")));
        assert!(!contains_structure(&doc, &parse("<user><age/><name/></user>")));
    }
}
