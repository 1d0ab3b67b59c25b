//! Event dispatch system
//!
//! Events carry a name and an optional typed detail payload. The
//! [`EventDispatcher`] is the process-wide event source shared by every
//! component instance; instances hold [`SubscriptionId`] handles so their
//! subscriptions can be removed deterministically on unmount.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

/// Common event names
pub mod event_types {
    pub const CLICK: &str = "click";
    pub const INPUT: &str = "input";
    pub const CHANGE: &str = "change";
    pub const KEY_DOWN: &str = "keydown";
    /// Form submission; default-suppressed by local handlers
    pub const SUBMIT: &str = "submit";

    // Navigation events, routed to the process-wide source by default
    pub const POPSTATE: &str = "popstate";
    pub const HASHCHANGE: &str = "hashchange";
}

/// Routing classification for handlers and emitted events
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EventChannel {
    /// Scoped to one component instance
    #[default]
    Local,
    /// Routed through the process-wide event source
    Global,
}

/// A named event with an optional typed payload
#[derive(Clone)]
pub struct Event {
    pub name: String,
    pub detail: Option<Rc<dyn Any>>,
    pub bubbles: bool,
    pub cancelable: bool,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl Event {
    /// Create a bubbling, cancelable event with no payload
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detail: None,
            bubbles: true,
            cancelable: true,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// Attach a payload
    pub fn with_detail<T: 'static>(mut self, detail: T) -> Self {
        self.detail = Some(Rc::new(detail));
        self
    }

    pub fn non_bubbling(mut self) -> Self {
        self.bubbles = false;
        self
    }

    pub fn non_cancelable(mut self) -> Self {
        self.cancelable = false;
        self
    }

    /// Downcast the payload
    pub fn detail<T: 'static>(&self) -> Option<&T> {
        self.detail.as_ref().and_then(|d| d.downcast_ref::<T>())
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Has no effect on non-cancelable events
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("has_detail", &self.detail.is_some())
            .field("bubbles", &self.bubbles)
            .field("default_prevented", &self.default_prevented)
            .field("propagation_stopped", &self.propagation_stopped)
            .finish()
    }
}

new_key_type! {
    /// Handle for one subscription on the process-wide event source
    pub struct SubscriptionId;
}

/// Event handler function type
pub type EventHandler = Rc<dyn Fn(&mut Event)>;

struct Subscription {
    event: String,
    handler: EventHandler,
}

#[derive(Default)]
struct DispatcherInner {
    subscriptions: SlotMap<SubscriptionId, Subscription>,
    by_event: FxHashMap<String, SmallVec<[SubscriptionId; 4]>>,
}

/// Process-wide event source
///
/// Cloning yields another handle to the same source. Handlers may
/// subscribe, unsubscribe or dispatch re-entrantly; a dispatch works on the
/// subscriber list captured when it started and skips handlers removed
/// since.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    inner: Rc<RefCell<DispatcherInner>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an event name
    pub fn subscribe<F>(&self, event: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&mut Event) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = inner.subscriptions.insert(Subscription {
            event: event.to_string(),
            handler: Rc::new(handler),
        });
        inner.by_event.entry(event.to_string()).or_default().push(id);
        id
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(subscription) = inner.subscriptions.remove(id) else {
            return false;
        };
        if let Some(ids) = inner.by_event.get_mut(&subscription.event) {
            ids.retain(|existing| *existing != id);
            if ids.is_empty() {
                inner.by_event.remove(&subscription.event);
            }
        }
        true
    }

    /// Dispatch an event to all current subscribers, returning how many ran
    pub fn dispatch(&self, event: &mut Event) -> usize {
        let ids: SmallVec<[SubscriptionId; 4]> = match self.inner.borrow().by_event.get(&event.name) {
            Some(ids) => ids.clone(),
            None => return 0,
        };

        let mut invoked = 0;
        for id in ids {
            if event.propagation_stopped() {
                break;
            }
            let handler = match self.inner.borrow().subscriptions.get(id) {
                Some(subscription) => Rc::clone(&subscription.handler),
                None => continue,
            };
            handler(event);
            invoked += 1;
        }
        invoked
    }

    /// Number of live subscriptions for one event name
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.inner
            .borrow()
            .by_event
            .get(event)
            .map_or(0, |ids| ids.len())
    }

    /// Total number of live subscriptions
    pub fn len(&self) -> usize {
        self.inner.borrow().subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("subscriptions", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_detail_downcast() {
        let event = Event::new("reached").with_detail(3i32);
        assert_eq!(event.detail::<i32>(), Some(&3));
        assert_eq!(event.detail::<String>(), None);
    }

    #[test]
    fn test_prevent_default_respects_cancelable() {
        let mut event = Event::new(event_types::SUBMIT);
        event.prevent_default();
        assert!(event.default_prevented());

        let mut fixed = Event::new("load").non_cancelable();
        fixed.prevent_default();
        assert!(!fixed.default_prevented());
    }

    #[test]
    fn test_dispatch_by_name() {
        let dispatcher = EventDispatcher::new();
        let hits = Rc::new(Cell::new(0));

        let h = hits.clone();
        dispatcher.subscribe(event_types::POPSTATE, move |_| h.set(h.get() + 1));

        assert_eq!(dispatcher.dispatch(&mut Event::new(event_types::POPSTATE)), 1);
        assert_eq!(dispatcher.dispatch(&mut Event::new(event_types::HASHCHANGE)), 0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let dispatcher = EventDispatcher::new();
        let hits = Rc::new(Cell::new(0));

        let h = hits.clone();
        let id = dispatcher.subscribe("tick", move |_| h.set(h.get() + 1));
        assert!(dispatcher.unsubscribe(id));
        assert!(!dispatcher.unsubscribe(id));

        dispatcher.dispatch(&mut Event::new("tick"));
        assert_eq!(hits.get(), 0);
        assert!(dispatcher.is_empty());
        assert_eq!(dispatcher.subscriber_count("tick"), 0);
    }

    #[test]
    fn test_handler_removed_mid_dispatch_is_skipped() {
        let dispatcher = EventDispatcher::new();
        let second_ran = Rc::new(Cell::new(false));
        let second_id: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));

        let d = dispatcher.clone();
        let victim = second_id.clone();
        dispatcher.subscribe("tick", move |_| {
            if let Some(id) = victim.get() {
                d.unsubscribe(id);
            }
        });
        let ran = second_ran.clone();
        second_id.set(Some(dispatcher.subscribe("tick", move |_| ran.set(true))));

        assert_eq!(dispatcher.dispatch(&mut Event::new("tick")), 1);
        assert!(!second_ran.get());
    }

    #[test]
    fn test_stop_propagation_halts_dispatch() {
        let dispatcher = EventDispatcher::new();
        let later = Rc::new(Cell::new(false));

        dispatcher.subscribe("tick", |event| event.stop_propagation());
        let l = later.clone();
        dispatcher.subscribe("tick", move |_| l.set(true));

        dispatcher.dispatch(&mut Event::new("tick"));
        assert!(!later.get());
    }
}
