//! Morph patching
//!
//! The leaf-level algorithm that brings a mounted subtree in line with a
//! candidate tree in place:
//!
//! 1. Ask `should_update` whether the pair needs work at all
//! 2. Replace the node outright when kinds differ
//! 3. Otherwise sync text, then attributes, then children by position,
//!    appending or removing the tail
//!
//! Nodes that survive keep their identity and host-only data.

use crate::document::{Document, NodeData, NodeId};
use crate::error::{HostError, Result};
use crate::node::{VElement, VNode};

/// Predicate consulted before descending into a mounted/candidate pair
pub type ShouldUpdate<'a> = &'a dyn Fn(&Document, NodeId, &VNode) -> bool;

/// Always descend
pub fn always(_: &Document, _: NodeId, _: &VNode) -> bool {
    true
}

/// Descend only into pairs that are not already structurally equal
pub fn differs(doc: &Document, mounted: NodeId, candidate: &VNode) -> bool {
    !doc.matches(mounted, candidate)
}

/// Patch `mounted` to match `candidate`, returning the node now in its place
pub fn morph(
    doc: &mut Document,
    mounted: NodeId,
    candidate: &VNode,
    should_update: ShouldUpdate<'_>,
) -> Result<NodeId> {
    if !should_update(doc, mounted, candidate) {
        return Ok(mounted);
    }

    let kind = doc.kind_name(mounted).ok_or(HostError::NodeNotFound(mounted))?;
    if kind != candidate.kind_name() {
        return replace(doc, mounted, candidate);
    }

    match candidate {
        VNode::Text(content) => {
            if doc.text(mounted) != Some(content.as_str()) {
                doc.set_text(mounted, content)?;
            }
        }
        VNode::Element(el) => {
            sync_attributes(doc, mounted, el)?;
            sync_children(doc, mounted, &el.children, should_update)?;
        }
    }
    Ok(mounted)
}

/// Swap `mounted` for a freshly built copy of `candidate`
pub fn replace(doc: &mut Document, mounted: NodeId, candidate: &VNode) -> Result<NodeId> {
    let fresh = doc.build(candidate);
    if let Some(parent) = doc.parent(mounted) {
        doc.replace_child(parent, fresh, mounted)?;
    }
    doc.discard(mounted);
    tracing::trace!(?mounted, ?fresh, kind = candidate.kind_name(), "replaced node");
    Ok(fresh)
}

fn sync_attributes(doc: &mut Document, mounted: NodeId, el: &VElement) -> Result<()> {
    let stale: Vec<String> = match doc.data(mounted) {
        Some(NodeData::Element { attrs, .. }) => attrs
            .keys()
            .filter(|name| !el.attrs.contains_key(*name))
            .cloned()
            .collect(),
        _ => return Err(HostError::NotAnElement(mounted)),
    };
    for name in stale {
        doc.remove_attribute(mounted, &name)?;
    }
    for (name, value) in &el.attrs {
        if doc.attribute(mounted, name) != Some(value.as_str()) {
            doc.set_attribute(mounted, name, value)?;
        }
    }
    Ok(())
}

fn sync_children(
    doc: &mut Document,
    mounted: NodeId,
    candidates: &[VNode],
    should_update: ShouldUpdate<'_>,
) -> Result<()> {
    let current: Vec<NodeId> = doc.children(mounted).to_vec();

    for (index, candidate) in candidates.iter().enumerate() {
        match current.get(index) {
            Some(existing) => {
                morph(doc, *existing, candidate, should_update)?;
            }
            None => {
                let fresh = doc.build(candidate);
                doc.append_child(mounted, fresh)?;
            }
        }
    }

    for extra in current.iter().skip(candidates.len()) {
        doc.remove_child(mounted, *extra)?;
        doc.discard(*extra);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{h, text};
    use tessera_core::TaskQueue;

    fn mount(view: VNode) -> (Document, NodeId, NodeId) {
        let mut doc = Document::new(TaskQueue::new());
        let container = doc.create_element("section");
        let node = doc.build(&view);
        doc.append_child(container, node).unwrap();
        (doc, container, node)
    }

    #[test]
    fn test_text_change_patches_in_place() {
        let (mut doc, _, node) = mount(h("p").text("a").into());
        let text_node = doc.children(node)[0];
        let before = doc.mutation_count();

        let result = morph(&mut doc, node, &h("p").text("b").into(), &always).unwrap();

        assert_eq!(result, node);
        assert_eq!(doc.children(node), &[text_node]);
        assert_eq!(doc.text(text_node), Some("b"));
        assert_eq!(doc.mutation_count() - before, 1);
    }

    #[test]
    fn test_attributes_added_changed_removed() {
        let (mut doc, _, node) = mount(h("input").attr("type", "text").attr("disabled", "").into());

        morph(
            &mut doc,
            node,
            &h("input").attr("type", "email").attr("name", "to").into(),
            &always,
        )
        .unwrap();

        assert_eq!(doc.attribute(node, "type"), Some("email"));
        assert_eq!(doc.attribute(node, "name"), Some("to"));
        assert_eq!(doc.attribute(node, "disabled"), None);
    }

    #[test]
    fn test_children_appended_and_trimmed() {
        let (mut doc, _, node) = mount(h("ul").child(h("li").text("1")).into());

        let longer: VNode = h("ul")
            .child(h("li").text("1"))
            .child(h("li").text("2"))
            .child(h("li").text("3"))
            .into();
        morph(&mut doc, node, &longer, &always).unwrap();
        assert_eq!(doc.snapshot(node), Some(longer));

        let shorter: VNode = h("ul").child(h("li").text("9")).into();
        morph(&mut doc, node, &shorter, &always).unwrap();
        assert_eq!(doc.snapshot(node), Some(shorter));
    }

    #[test]
    fn test_kind_mismatch_in_child_replaces_only_that_child() {
        let (mut doc, _, node) = mount(h("div").child(h("span")).child(h("em")).into());
        let kept = doc.children(node)[1];
        let replaced = doc.children(node)[0];

        morph(
            &mut doc,
            node,
            &h("div").child(text("plain")).child(h("em")).into(),
            &always,
        )
        .unwrap();

        assert!(!doc.contains(replaced));
        assert_eq!(doc.children(node)[1], kept);
        assert_eq!(doc.text(doc.children(node)[0]), Some("plain"));
    }

    #[test]
    fn test_differs_ignores_attribute_order() {
        let (doc, _, node) = mount(h("a").attr("href", "/").attr("rel", "next").text("go").into());

        assert!(!differs(&doc, node, &h("a").attr("rel", "next").attr("href", "/").text("go").into()));
        assert!(differs(&doc, node, &h("a").attr("href", "/").text("go").into()));
        assert!(differs(&doc, node, &h("a").attr("href", "/").attr("rel", "next").into()));
    }

    #[test]
    fn test_should_update_skips_equal_subtrees() {
        let (mut doc, _, node) = mount(
            h("div")
                .child(h("header").text("title"))
                .child(h("main").text("body"))
                .into(),
        );
        let header = doc.children(node)[0];
        doc.set_host_data(header, "scroll", "40").unwrap();

        let visited = std::cell::RefCell::new(Vec::new());
        let predicate = |doc: &Document, id: NodeId, candidate: &VNode| {
            visited.borrow_mut().push(id);
            differs(doc, id, candidate)
        };
        morph(
            &mut doc,
            node,
            &h("div")
                .child(h("header").text("title"))
                .child(h("main").text("changed"))
                .into(),
            &predicate,
        )
        .unwrap();

        // header was visited but not descended into
        assert!(visited.borrow().contains(&header));
        assert!(!visited.borrow().contains(&doc.children(header)[0]));
        assert_eq!(doc.host_data(header, "scroll"), Some("40"));
    }
}
