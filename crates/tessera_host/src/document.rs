//! Node document
//!
//! An arena of host nodes. Elements own ordered attributes and children;
//! a shadow root is attached to an element as its encapsulated boundary but
//! is not one of its children. Event paths cross that boundary, mutation
//! scoping does not.
//!
//! Every tree-visible change (insertions, removals, attribute and text
//! writes) bumps [`Document::mutation_count`] and is reported to the
//! mutation observers.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use tessera_core::{Event, EventHandler, TaskQueue};

use crate::error::{HostError, Result};
use crate::form::FormInternals;
use crate::node::{VElement, VNode, TEXT_KIND};
use crate::observer::{
    MutationCallback, MutationFilter, MutationKind, MutationObservers, MutationRecord, ObserverId,
};
use crate::style::StyleSource;

new_key_type! {
    pub struct NodeId;
    pub struct ListenerId;
}

/// Node payload
#[derive(Clone, Debug, PartialEq)]
pub enum NodeData {
    Document,
    Element {
        tag: String,
        attrs: IndexMap<String, String>,
    },
    Text(String),
    ShadowRoot {
        host: NodeId,
    },
}

impl NodeData {
    /// Tag name for elements, `#text`, `#shadow-root` or `#document`
    pub fn kind_name(&self) -> &str {
        match self {
            NodeData::Document => "#document",
            NodeData::Element { tag, .. } => tag.as_str(),
            NodeData::Text(_) => TEXT_KIND,
            NodeData::ShadowRoot { .. } => "#shadow-root",
        }
    }

    fn is_container(&self) -> bool {
        !matches!(self, NodeData::Text(_))
    }
}

struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    shadow: Option<NodeId>,
    /// State the host keeps that candidate trees never describe
    host_data: FxHashMap<String, String>,
    internals: Option<FormInternals>,
    styles: Vec<StyleSource>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
            shadow: None,
            host_data: FxHashMap::default(),
            internals: None,
            styles: Vec::new(),
        }
    }
}

pub(crate) struct Listener {
    pub node: NodeId,
    pub event: String,
    pub capture: bool,
    pub handler: EventHandler,
}

/// The host node tree
pub struct Document {
    nodes: SlotMap<NodeId, Node>,
    listeners: SlotMap<ListenerId, Listener>,
    root: NodeId,
    mutations: u64,
    observers: MutationObservers,
    tasks: TaskQueue,
}

impl Document {
    /// Create an empty document whose observers deliver on `tasks`
    pub fn new(tasks: TaskQueue) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(NodeData::Document));
        Self {
            nodes,
            listeners: SlotMap::with_key(),
            root,
            mutations: 0,
            observers: MutationObservers::new(),
            tasks,
        }
    }

    /// The document node
    pub fn root(&self) -> NodeId {
        self.root
    }

    // =========================================================================
    // Node creation and inspection
    // =========================================================================

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.insert(Node::new(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: IndexMap::new(),
        }))
    }

    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.nodes
            .insert(Node::new(NodeData::Text(content.to_string())))
    }

    /// Create a detached subtree from a candidate tree
    pub fn build(&mut self, candidate: &VNode) -> NodeId {
        match candidate {
            VNode::Text(content) => self.create_text(content),
            VNode::Element(VElement {
                tag,
                attrs,
                children,
            }) => {
                let id = self.nodes.insert(Node::new(NodeData::Element {
                    tag: tag.clone(),
                    attrs: attrs.clone(),
                }));
                let child_ids: Vec<NodeId> = children.iter().map(|c| self.build(c)).collect();
                for child in &child_ids {
                    self.nodes[*child].parent = Some(id);
                }
                self.nodes[id].children = child_ids;
                id
            }
        }
    }

    /// Describe a mounted element or text subtree as a candidate tree
    pub fn snapshot(&self, id: NodeId) -> Option<VNode> {
        let node = self.nodes.get(id)?;
        match &node.data {
            NodeData::Text(content) => Some(VNode::Text(content.clone())),
            NodeData::Element { tag, attrs } => Some(VNode::Element(VElement {
                tag: tag.clone(),
                attrs: attrs.clone(),
                children: node
                    .children
                    .iter()
                    .filter_map(|child| self.snapshot(*child))
                    .collect(),
            })),
            NodeData::Document | NodeData::ShadowRoot { .. } => None,
        }
    }

    /// Whether a mounted subtree is structurally equal to `candidate`
    ///
    /// Same answer as comparing against [`Document::snapshot`], without
    /// building the snapshot.
    pub fn matches(&self, id: NodeId, candidate: &VNode) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        match (&node.data, candidate) {
            (NodeData::Text(content), VNode::Text(expected)) => content == expected,
            (NodeData::Element { tag, attrs }, VNode::Element(el)) => {
                *tag == el.tag
                    && *attrs == el.attrs
                    && node.children.len() == el.children.len()
                    && node
                        .children
                        .iter()
                        .zip(&el.children)
                        .all(|(child, expected)| self.matches(*child, expected))
            }
            _ => false,
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id).map(|n| &n.data)
    }

    pub fn kind_name(&self, id: NodeId) -> Option<&str> {
        self.data(id).map(NodeData::kind_name)
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.data(id)? {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id)? {
            NodeData::Text(content) => Some(content.as_str()),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.data(id)? {
            NodeData::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.nodes.get(id) {
            Some(node) => &node.children,
            None => &[],
        }
    }

    /// Whether the node is reachable from the document, crossing shadow
    /// boundaries
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == self.root {
                return true;
            }
            current = match self.nodes.get(node_id) {
                Some(Node {
                    data: NodeData::ShadowRoot { host },
                    ..
                }) => Some(*host),
                Some(node) => node.parent,
                None => None,
            };
        }
        false
    }

    /// Total tree-visible mutations performed so far
    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    // =========================================================================
    // Tree mutation
    // =========================================================================

    /// Append `child` to `parent`, detaching it from any previous parent
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_insertable(parent, child)?;
        self.detach(child);
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
        self.record(
            parent,
            MutationKind::ChildList {
                added: vec![child],
                removed: Vec::new(),
            },
        );
        Ok(())
    }

    /// Put `new_child` in the position of `old_child`
    pub fn replace_child(&mut self, parent: NodeId, new_child: NodeId, old_child: NodeId) -> Result<()> {
        self.check_insertable(parent, new_child)?;
        if self.parent(old_child) != Some(parent) {
            return Err(HostError::NotAChild {
                parent,
                child: old_child,
            });
        }
        if new_child == old_child {
            return Ok(());
        }
        // new_child may be an earlier sibling; look old_child up after it moves
        self.detach(new_child);
        let position = self.nodes[parent]
            .children
            .iter()
            .position(|c| *c == old_child)
            .ok_or(HostError::NotAChild {
                parent,
                child: old_child,
            })?;
        self.nodes[parent].children[position] = new_child;
        self.nodes[new_child].parent = Some(parent);
        self.nodes[old_child].parent = None;
        self.record(
            parent,
            MutationKind::ChildList {
                added: vec![new_child],
                removed: vec![old_child],
            },
        );
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.contains(parent) {
            return Err(HostError::NodeNotFound(parent));
        }
        if self.parent(child) != Some(parent) {
            return Err(HostError::NotAChild { parent, child });
        }
        self.detach(child);
        Ok(())
    }

    /// Remove every child of a node
    pub fn clear_children(&mut self, parent: NodeId) -> Result<Vec<NodeId>> {
        let node = self
            .nodes
            .get_mut(parent)
            .ok_or(HostError::NodeNotFound(parent))?;
        let removed = std::mem::take(&mut node.children);
        if removed.is_empty() {
            return Ok(removed);
        }
        for child in &removed {
            self.nodes[*child].parent = None;
        }
        self.record(
            parent,
            MutationKind::ChildList {
                added: Vec::new(),
                removed: removed.clone(),
            },
        );
        Ok(removed)
    }

    /// Free a detached subtree, its listeners and its shadow tree
    pub fn discard(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            if let Some(node) = self.nodes.get_mut(parent) {
                node.children.retain(|c| *c != id);
            }
        }
        let mut stack: SmallVec<[NodeId; 16]> = SmallVec::new();
        stack.push(id);
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                stack.extend(node.children);
                stack.extend(node.shadow);
            }
        }
        self.listeners.retain(|_, l| self.nodes.contains_key(l.node));
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        let old_value = match &mut self.nodes.get_mut(id).ok_or(HostError::NodeNotFound(id))?.data {
            NodeData::Element { attrs, .. } => attrs.insert(name.to_string(), value.to_string()),
            _ => return Err(HostError::NotAnElement(id)),
        };
        self.record(
            id,
            MutationKind::Attributes {
                name: name.to_string(),
                old_value,
            },
        );
        Ok(())
    }

    /// Remove an attribute; returns whether it was present
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<bool> {
        let old_value = match &mut self.nodes.get_mut(id).ok_or(HostError::NodeNotFound(id))?.data {
            NodeData::Element { attrs, .. } => attrs.shift_remove(name),
            _ => return Err(HostError::NotAnElement(id)),
        };
        let present = old_value.is_some();
        if present {
            self.record(
                id,
                MutationKind::Attributes {
                    name: name.to_string(),
                    old_value,
                },
            );
        }
        Ok(present)
    }

    pub fn set_text(&mut self, id: NodeId, content: &str) -> Result<()> {
        let old_value = match &mut self.nodes.get_mut(id).ok_or(HostError::NodeNotFound(id))?.data {
            NodeData::Text(existing) => std::mem::replace(existing, content.to_string()),
            _ => return Err(HostError::NotAContainer(id)),
        };
        self.record(id, MutationKind::CharacterData { old_value });
        Ok(())
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let parent_node = self.nodes.get(parent).ok_or(HostError::NodeNotFound(parent))?;
        if !parent_node.data.is_container() {
            return Err(HostError::NotAContainer(parent));
        }
        if !self.contains(child) {
            return Err(HostError::NodeNotFound(child));
        }
        let mut current = Some(parent);
        while let Some(node) = current {
            if node == child {
                return Err(HostError::HierarchyCycle { parent, child });
            }
            current = self.parent(node);
        }
        Ok(())
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.nodes[child].parent.take() else {
            return;
        };
        self.nodes[parent].children.retain(|c| *c != child);
        self.record(
            parent,
            MutationKind::ChildList {
                added: Vec::new(),
                removed: vec![child],
            },
        );
    }

    fn record(&mut self, target: NodeId, kind: MutationKind) {
        self.mutations += 1;
        if self.observers.is_empty() {
            return;
        }
        let ancestors = self.scope_ancestors(target);
        self.observers
            .enqueue(MutationRecord { target, kind }, &ancestors, &self.tasks);
    }

    /// Ancestors for mutation scoping; stops at the first shadow root
    fn scope_ancestors(&self, id: NodeId) -> SmallVec<[NodeId; 8]> {
        let mut ancestors = SmallVec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            ancestors.push(node);
            current = self.parent(node);
        }
        ancestors
    }

    // =========================================================================
    // Shadow roots, styles and host-only data
    // =========================================================================

    /// Attach (or return the existing) shadow root of an element
    pub fn attach_shadow(&mut self, host: NodeId) -> Result<NodeId> {
        let node = self.nodes.get(host).ok_or(HostError::NodeNotFound(host))?;
        if !matches!(node.data, NodeData::Element { .. }) {
            return Err(HostError::NotAnElement(host));
        }
        if let Some(shadow) = node.shadow {
            return Ok(shadow);
        }
        let shadow = self.nodes.insert(Node::new(NodeData::ShadowRoot { host }));
        self.nodes[host].shadow = Some(shadow);
        Ok(shadow)
    }

    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.nodes.get(host).and_then(|n| n.shadow)
    }

    pub fn adopt_style(&mut self, shadow: NodeId, style: StyleSource) -> Result<()> {
        let node = self.nodes.get_mut(shadow).ok_or(HostError::NodeNotFound(shadow))?;
        if !node.styles.contains(&style) {
            node.styles.push(style);
        }
        Ok(())
    }

    pub fn styles(&self, shadow: NodeId) -> &[StyleSource] {
        match self.nodes.get(shadow) {
            Some(node) => &node.styles,
            None => &[],
        }
    }

    pub fn clear_styles(&mut self, shadow: NodeId) {
        if let Some(node) = self.nodes.get_mut(shadow) {
            node.styles.clear();
        }
    }

    pub fn set_host_data(&mut self, id: NodeId, key: &str, value: &str) -> Result<()> {
        self.nodes
            .get_mut(id)
            .ok_or(HostError::NodeNotFound(id))?
            .host_data
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn host_data(&self, id: NodeId, key: &str) -> Option<&str> {
        self.nodes
            .get(id)
            .and_then(|n| n.host_data.get(key))
            .map(String::as_str)
    }

    // =========================================================================
    // Form internals
    // =========================================================================

    /// Attach (or keep) form internals on an element
    pub fn attach_internals(&mut self, id: NodeId) -> Result<()> {
        let node = self.nodes.get_mut(id).ok_or(HostError::NodeNotFound(id))?;
        if !matches!(node.data, NodeData::Element { .. }) {
            return Err(HostError::NotAnElement(id));
        }
        node.internals.get_or_insert_with(FormInternals::new);
        Ok(())
    }

    pub fn internals(&self, id: NodeId) -> Option<&FormInternals> {
        self.nodes.get(id).and_then(|n| n.internals.as_ref())
    }

    pub fn internals_mut(&mut self, id: NodeId) -> Result<&mut FormInternals> {
        self.nodes
            .get_mut(id)
            .ok_or(HostError::NodeNotFound(id))?
            .internals
            .as_mut()
            .ok_or(HostError::NoFormInternals(id))
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    pub fn add_listener<F>(&mut self, node: NodeId, event: &str, capture: bool, handler: F) -> Result<ListenerId>
    where
        F: Fn(&mut Event) + 'static,
    {
        if !self.contains(node) {
            return Err(HostError::NodeNotFound(node));
        }
        Ok(self.listeners.insert(Listener {
            node,
            event: event.to_string(),
            capture,
            handler: Rc::new(handler),
        }))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id).is_some()
    }

    pub fn has_listener(&self, id: ListenerId) -> bool {
        self.listeners.contains_key(id)
    }

    pub fn listener_count(&self, node: NodeId) -> usize {
        self.listeners.values().filter(|l| l.node == node).count()
    }

    pub(crate) fn listeners_for(&self, node: NodeId, event: &str) -> Vec<(ListenerId, bool, EventHandler)> {
        self.listeners
            .iter()
            .filter(|(_, l)| l.node == node && l.event == event)
            .map(|(id, l)| (id, l.capture, Rc::clone(&l.handler)))
            .collect()
    }

    /// Composed event path: target first, crossing shadow boundaries
    pub fn event_path(&self, target: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = Some(target);
        while let Some(id) = current {
            let Some(node) = self.nodes.get(id) else {
                break;
            };
            path.push(id);
            current = match node.data {
                NodeData::ShadowRoot { host } => Some(host),
                _ => node.parent,
            };
        }
        path
    }

    // =========================================================================
    // Mutation observers
    // =========================================================================

    pub fn observe<F>(&mut self, target: NodeId, filter: MutationFilter, callback: F) -> Result<ObserverId>
    where
        F: Fn(&[MutationRecord]) + 'static,
    {
        if !self.contains(target) {
            return Err(HostError::NodeNotFound(target));
        }
        let callback: MutationCallback = Rc::new(callback);
        Ok(self.observers.observe(target, filter, callback))
    }

    pub fn disconnect_observer(&mut self, id: ObserverId) -> bool {
        self.observers.disconnect(id)
    }

    pub fn observers(&self) -> &MutationObservers {
        &self.observers
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes.len())
            .field("listeners", &self.listeners.len())
            .field("mutations", &self.mutations)
            .finish()
    }
}
