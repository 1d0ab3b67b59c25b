//! Reconciliation
//!
//! Merges a freshly rendered candidate into the mounted tree. Equal trees
//! cost nothing, a root of a different kind is swapped wholesale, and
//! anything else is morphed in place, skipping subtrees that already match.

use tessera_host::patch;
use tessera_host::{Document, HostError, NodeId, VNode};

/// What a reconcile pass did to the mounted root
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconciled {
    /// Already structurally equal; nothing touched
    Unchanged,
    /// Different kind; the old root was detached and discarded
    Replaced { old: NodeId, new: NodeId },
    /// Patched in place
    Patched(NodeId),
}

impl Reconciled {
    /// The root mounted after this pass
    pub fn root(&self, previous: NodeId) -> NodeId {
        match *self {
            Reconciled::Unchanged => previous,
            Reconciled::Replaced { new, .. } => new,
            Reconciled::Patched(root) => root,
        }
    }

    pub fn changed(&self) -> bool {
        !matches!(self, Reconciled::Unchanged)
    }
}

/// Build `candidate` and append it under `boundary`
pub fn mount(doc: &mut Document, boundary: NodeId, candidate: &VNode) -> Result<NodeId, HostError> {
    let root = doc.build(candidate);
    doc.append_child(boundary, root)?;
    tracing::trace!(?root, nodes = candidate.node_count(), "mounted");
    Ok(root)
}

/// Bring `mounted` in line with `candidate`
pub fn reconcile(doc: &mut Document, mounted: NodeId, candidate: &VNode) -> Result<Reconciled, HostError> {
    let current = doc.snapshot(mounted).ok_or(HostError::NodeNotFound(mounted))?;
    if current == *candidate {
        tracing::trace!(?mounted, "redraw skipped, tree unchanged");
        return Ok(Reconciled::Unchanged);
    }

    if current.kind_name() != candidate.kind_name() {
        let new = patch::replace(doc, mounted, candidate)?;
        tracing::debug!(from = current.kind_name(), to = candidate.kind_name(), "root replaced");
        return Ok(Reconciled::Replaced { old: mounted, new });
    }

    let root = patch::morph(doc, mounted, candidate, &patch::differs)?;
    tracing::trace!(?root, "root morphed");
    Ok(Reconciled::Patched(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::TaskQueue;
    use tessera_host::{h, text};

    fn mounted(view: VNode) -> (Document, NodeId, NodeId) {
        let mut doc = Document::new(TaskQueue::new());
        let host = doc.create_element("x-test");
        let shadow = doc.attach_shadow(host).unwrap();
        let root = mount(&mut doc, shadow, &view).unwrap();
        (doc, shadow, root)
    }

    #[test]
    fn test_equal_tree_costs_no_mutation() {
        let view: VNode = h("p").text("same").into();
        let (mut doc, _, root) = mounted(view.clone());
        let before = doc.mutation_count();

        assert_eq!(reconcile(&mut doc, root, &view).unwrap(), Reconciled::Unchanged);
        assert_eq!(doc.mutation_count(), before);
    }

    #[test]
    fn test_kind_change_replaces_root() {
        let (mut doc, shadow, root) = mounted(h("div").text("loading").into());
        doc.set_host_data(root, "scroll", "120").unwrap();

        let outcome = reconcile(&mut doc, root, &h("ul").child(h("li").text("a")).into()).unwrap();
        let Reconciled::Replaced { old, new } = outcome else {
            panic!("expected replacement, got {outcome:?}");
        };
        assert_eq!(old, root);
        assert!(!doc.contains(old));
        assert_eq!(doc.children(shadow), &[new]);
        assert_eq!(doc.host_data(new, "scroll"), None);
        assert_eq!(outcome.root(root), new);
    }

    #[test]
    fn test_same_kind_patches_in_place() {
        let (mut doc, shadow, root) = mounted(
            h("div")
                .attr("class", "a")
                .child(h("span").text("keep"))
                .child(text("old"))
                .into(),
        );
        doc.set_host_data(root, "focus", "yes").unwrap();

        let outcome = reconcile(
            &mut doc,
            root,
            &h("div")
                .attr("class", "b")
                .child(h("span").text("keep"))
                .child(text("new"))
                .into(),
        )
        .unwrap();

        assert_eq!(outcome, Reconciled::Patched(root));
        assert!(outcome.changed());
        assert_eq!(doc.children(shadow), &[root]);
        assert_eq!(doc.attribute(root, "class"), Some("b"));
        assert_eq!(doc.host_data(root, "focus"), Some("yes"));
    }
}
