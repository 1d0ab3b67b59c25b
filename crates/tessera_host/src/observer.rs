//! Mutation observation
//!
//! Observers watch one target node with a [`MutationFilter`]. The document
//! reports each mutation together with the target's ancestor chain; matching
//! records are queued per observer and delivered as one batch on a
//! microtask. Disconnecting an observer drops whatever was queued for it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};
use tessera_core::TaskQueue;

use crate::document::NodeId;

new_key_type! {
    /// Handle for a registered mutation observer
    pub struct ObserverId;
}

/// What changed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationKind {
    ChildList {
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    Attributes {
        name: String,
        old_value: Option<String>,
    },
    CharacterData {
        old_value: String,
    },
}

/// A single observed mutation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub kind: MutationKind,
}

/// Which mutations an observer cares about
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MutationFilter {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    pub subtree: bool,
    /// Restrict attribute records to these names
    pub attribute_filter: Option<Vec<String>>,
}

impl MutationFilter {
    /// Child-list, attribute and text changes anywhere in the subtree
    pub fn all() -> Self {
        Self {
            child_list: true,
            attributes: true,
            character_data: true,
            subtree: true,
            attribute_filter: None,
        }
    }

    /// Only changes to the named attributes on the target itself
    pub fn attributes_named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attributes: true,
            attribute_filter: Some(names.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn with_subtree(mut self, subtree: bool) -> Self {
        self.subtree = subtree;
        self
    }

    fn accepts(&self, kind: &MutationKind) -> bool {
        match kind {
            MutationKind::ChildList { .. } => self.child_list,
            MutationKind::Attributes { name, .. } => {
                self.attributes
                    && self
                        .attribute_filter
                        .as_ref()
                        .is_none_or(|names| names.iter().any(|n| n == name))
            }
            MutationKind::CharacterData { .. } => self.character_data,
        }
    }
}

/// Observer callback; receives one batch of records
pub type MutationCallback = Rc<dyn Fn(&[MutationRecord])>;

struct Registration {
    target: NodeId,
    filter: MutationFilter,
    callback: MutationCallback,
    queued: Vec<MutationRecord>,
}

#[derive(Default)]
struct Registry {
    observers: SlotMap<ObserverId, Registration>,
    delivery_scheduled: bool,
    delivered: u64,
}

/// Shared registry of mutation observers for one document
#[derive(Clone, Default)]
pub struct MutationObservers {
    registry: Rc<RefCell<Registry>>,
}

impl MutationObservers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(
        &self,
        target: NodeId,
        filter: MutationFilter,
        callback: MutationCallback,
    ) -> ObserverId {
        self.registry.borrow_mut().observers.insert(Registration {
            target,
            filter,
            callback,
            queued: Vec::new(),
        })
    }

    /// Remove an observer and drop its queued records
    pub fn disconnect(&self, id: ObserverId) -> bool {
        self.registry.borrow_mut().observers.remove(id).is_some()
    }

    pub fn is_observing(&self, id: ObserverId) -> bool {
        self.registry.borrow().observers.contains_key(id)
    }

    /// Queue a record for every observer that matches
    ///
    /// `ancestors` lists the record target's ancestors, nearest first, up to
    /// (and including) the nearest shadow root or the document.
    pub(crate) fn enqueue(&self, record: MutationRecord, ancestors: &[NodeId], tasks: &TaskQueue) {
        let schedule = {
            let mut registry = self.registry.borrow_mut();
            let mut matched = false;
            for (_, reg) in registry.observers.iter_mut() {
                let in_scope = reg.target == record.target
                    || (reg.filter.subtree && ancestors.contains(&reg.target));
                if in_scope && reg.filter.accepts(&record.kind) {
                    reg.queued.push(record.clone());
                    matched = true;
                }
            }
            let schedule = matched && !registry.delivery_scheduled;
            if schedule {
                registry.delivery_scheduled = true;
            }
            schedule
        };

        if schedule {
            let observers = self.clone();
            tasks.queue_microtask(move || observers.deliver());
        }
    }

    /// Deliver every queued batch
    pub fn deliver(&self) {
        let batches: Vec<(ObserverId, MutationCallback, Vec<MutationRecord>)> = {
            let mut registry = self.registry.borrow_mut();
            registry.delivery_scheduled = false;
            registry
                .observers
                .iter_mut()
                .filter(|(_, reg)| !reg.queued.is_empty())
                .map(|(id, reg)| (id, Rc::clone(&reg.callback), std::mem::take(&mut reg.queued)))
                .collect()
        };

        for (id, callback, records) in batches {
            {
                // An earlier callback in this pass may have disconnected it
                let mut registry = self.registry.borrow_mut();
                if !registry.observers.contains_key(id) {
                    continue;
                }
                registry.delivered += 1;
            }
            callback(&records);
        }
    }

    /// Number of batches delivered so far
    pub fn delivered(&self) -> u64 {
        self.registry.borrow().delivered
    }

    pub fn len(&self) -> usize {
        self.registry.borrow().observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for MutationObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationObservers")
            .field("observers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_filter() {
        let filter = MutationFilter::attributes_named(["open"]);
        assert!(filter.accepts(&MutationKind::Attributes {
            name: "open".into(),
            old_value: None,
        }));
        assert!(!filter.accepts(&MutationKind::Attributes {
            name: "class".into(),
            old_value: None,
        }));
        assert!(!filter.accepts(&MutationKind::CharacterData {
            old_value: String::new(),
        }));
    }

    #[test]
    fn test_disconnect_during_delivery_drops_taken_batch() {
        use std::cell::Cell;

        let observers = MutationObservers::new();
        let mut targets: SlotMap<NodeId, ()> = SlotMap::with_key();
        let a = targets.insert(());
        let b = targets.insert(());
        let tasks = TaskQueue::new();

        let second: Rc<Cell<Option<ObserverId>>> = Rc::new(Cell::new(None));
        let fired = Rc::new(Cell::new(0));

        let registry = observers.clone();
        let victim = Rc::clone(&second);
        let first_fired = Rc::clone(&fired);
        let first = observers.observe(
            a,
            MutationFilter::all(),
            Rc::new(move |_: &[MutationRecord]| {
                first_fired.set(first_fired.get() + 1);
                if let Some(id) = victim.get() {
                    registry.disconnect(id);
                }
            }),
        );
        let second_fired = Rc::clone(&fired);
        let id = observers.observe(
            b,
            MutationFilter::all(),
            Rc::new(move |_: &[MutationRecord]| second_fired.set(second_fired.get() + 100)),
        );
        second.set(Some(id));

        let attr = |target| MutationRecord {
            target,
            kind: MutationKind::Attributes {
                name: "open".into(),
                old_value: None,
            },
        };
        observers.enqueue(attr(a), &[], &tasks);
        observers.enqueue(attr(b), &[], &tasks);
        tasks.run_until_idle();

        assert!(observers.is_observing(first));
        assert!(!observers.is_observing(id));
        assert_eq!(fired.get(), 1);
        assert_eq!(observers.delivered(), 1);
    }

    #[test]
    fn test_default_watch_filter_accepts_everything() {
        let filter = MutationFilter::all();
        assert!(filter.subtree);
        assert!(filter.accepts(&MutationKind::ChildList {
            added: vec![],
            removed: vec![],
        }));
    }
}
