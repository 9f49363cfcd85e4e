//! XML reading and writing for the document model.

pub mod parse;
pub mod serialize;

use roxmltree::Node;

/// Get the tag name without namespace prefix.
pub(crate) fn tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// All element children of a node.
pub(crate) fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| child.is_element())
}

/// Find the first child element with the given tag name.
pub(crate) fn find_child<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &str,
) -> Option<Node<'a, 'input>> {
    element_children(node).find(|child| tag_name(*child) == tag)
}

/// Attribute lookup that ignores namespacing on the attribute name
/// (`xml:id` and plain `id` both answer to "id" in roxmltree).
pub(crate) fn attribute<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name() == name)
        .map(|a| a.value())
}

/// Parse a yes/no attribute value.
pub(crate) fn yes_no(value: &str) -> bool {
    value != "no"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers() {
        let xml = r#"<root xml:id="r" xmlns="urn:x"><a/><b n="2"/></root>"#;
        let doc = roxmltree::Document::parse(xml).expect("parse");
        let root = doc.root_element();
        assert_eq!(tag_name(root), "root");
        assert_eq!(attribute(root, "id"), Some("r"));
        assert!(find_child(root, "b").is_some());
        assert!(find_child(root, "c").is_none());
        assert_eq!(element_children(root).count(), 2);
        assert!(yes_no("yes"));
        assert!(!yes_no("no"));
    }
}
