//! Listener dispatch
//!
//! Events travel the composed path from the document down to the target
//! (capture), then back up (bubble). Each node's listeners are captured when
//! dispatch starts; listeners removed mid-dispatch are skipped. The document
//! is never borrowed while a listener runs, so listeners may mutate the tree
//! or dispatch further events.

use std::cell::RefCell;

use tessera_core::{Event, EventHandler};

use crate::document::{Document, ListenerId, NodeId};
use crate::error::{HostError, Result};

type Planned = Vec<(NodeId, Vec<(ListenerId, bool, EventHandler)>)>;

/// Dispatch an event at a target node
///
/// Returns `Ok(false)` if a listener called `prevent_default`.
pub fn dispatch(document: &RefCell<Document>, target: NodeId, event: &mut Event) -> Result<bool> {
    let plan: Planned = {
        let doc = document.borrow();
        if !doc.contains(target) {
            tracing::warn!(?target, event = %event.name, "dispatch on removed node");
            return Err(HostError::NodeNotFound(target));
        }
        doc.event_path(target)
            .into_iter()
            .map(|node| (node, doc.listeners_for(node, &event.name)))
            .collect()
    };
    tracing::trace!(event = %event.name, path = plan.len(), "dispatching");

    // Capture phase, outermost first
    for (_, listeners) in plan.iter().rev() {
        if event.propagation_stopped() {
            return Ok(!event.default_prevented());
        }
        for (id, capture, handler) in listeners {
            if *capture {
                invoke(document, *id, handler, event);
            }
        }
    }

    // Target and bubble phases, innermost first
    for (index, (_, listeners)) in plan.iter().enumerate() {
        if event.propagation_stopped() || (index > 0 && !event.bubbles) {
            break;
        }
        for (id, capture, handler) in listeners {
            if !*capture {
                invoke(document, *id, handler, event);
            }
        }
    }

    Ok(!event.default_prevented())
}

fn invoke(document: &RefCell<Document>, id: ListenerId, handler: &EventHandler, event: &mut Event) {
    if document.borrow().has_listener(id) {
        handler(event);
    }
}
