//! Host error types

use thiserror::Error;

use crate::document::NodeId;

/// Host platform errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The node was discarded or never existed
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// The operation needs an element node
    #[error("Node is not an element: {0:?}")]
    NotAnElement(NodeId),

    /// The node cannot hold children
    #[error("Node cannot have children: {0:?}")]
    NotAContainer(NodeId),

    /// The child is not attached to the given parent
    #[error("Node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// Inserting the node would create a cycle
    #[error("Inserting {child:?} under {parent:?} would create a cycle")]
    HierarchyCycle { parent: NodeId, child: NodeId },

    /// The element has no attached shadow root
    #[error("Element has no shadow root: {0:?}")]
    NoShadowRoot(NodeId),

    /// The element has no form internals attached
    #[error("Element has no form internals: {0:?}")]
    NoFormInternals(NodeId),
}

/// Result type for host operations
pub type Result<T> = std::result::Result<T, HostError>;
