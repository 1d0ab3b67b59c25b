//! Host environment
//!
//! The bundle of shared host services handed to every component handler:
//! the document, the task queue, the process-wide event source and the
//! current location.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use tessera_core::events::event_types;
use tessera_core::{Event, EventDispatcher, TaskQueue};

use crate::dispatch;
use crate::document::{Document, NodeId};
use crate::error::Result;

/// Shared host services; clones refer to the same host
#[derive(Clone)]
pub struct HostEnv {
    document: Rc<RefCell<Document>>,
    tasks: TaskQueue,
    window: EventDispatcher,
    location: Rc<RefCell<String>>,
}

impl HostEnv {
    pub fn new() -> Self {
        let tasks = TaskQueue::new();
        Self {
            document: Rc::new(RefCell::new(Document::new(tasks.clone()))),
            tasks,
            window: EventDispatcher::new(),
            location: Rc::new(RefCell::new(String::from("/"))),
        }
    }

    pub fn document(&self) -> &Rc<RefCell<Document>> {
        &self.document
    }

    /// Borrow the document
    ///
    /// # Panics
    ///
    /// Panics if the document is mutably borrowed.
    pub fn doc(&self) -> Ref<'_, Document> {
        self.document.borrow()
    }

    /// Mutably borrow the document
    ///
    /// # Panics
    ///
    /// Panics if the document is already borrowed.
    pub fn doc_mut(&self) -> RefMut<'_, Document> {
        self.document.borrow_mut()
    }

    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    /// The process-wide event source
    pub fn window(&self) -> &EventDispatcher {
        &self.window
    }

    /// Dispatch an event at a node of the document
    pub fn dispatch(&self, target: NodeId, event: &mut Event) -> Result<bool> {
        dispatch::dispatch(&self.document, target, event)
    }

    pub fn location(&self) -> String {
        self.location.borrow().clone()
    }

    /// Change the location and announce it on the process-wide source
    pub fn navigate(&self, url: impl Into<String>) {
        let url = url.into();
        *self.location.borrow_mut() = url.clone();
        tracing::debug!(%url, "navigate");
        let mut event = Event::new(event_types::POPSTATE)
            .with_detail(url)
            .non_cancelable();
        self.window.dispatch(&mut event);
    }
}

impl Default for HostEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HostEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostEnv")
            .field("location", &*self.location.borrow())
            .field("tasks", &self.tasks)
            .field("window", &self.window)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_navigate_updates_location_and_fires_popstate() {
        let env = HostEnv::new();
        let seen = Rc::new(RefCell::new(None));

        let s = seen.clone();
        env.window().subscribe(event_types::POPSTATE, move |event| {
            *s.borrow_mut() = event.detail::<String>().cloned();
        });

        env.navigate("/settings");
        assert_eq!(env.location(), "/settings");
        assert_eq!(seen.borrow().as_deref(), Some("/settings"));
    }

    #[test]
    fn test_observer_delivery_rides_the_task_queue() {
        let env = HostEnv::new();
        let hits = Rc::new(Cell::new(0));
        let host = env.doc_mut().create_element("x-note");

        let h = hits.clone();
        env.doc_mut()
            .observe(host, crate::MutationFilter::all(), move |_| h.set(h.get() + 1))
            .unwrap();
        env.doc_mut().set_attribute(host, "title", "a").unwrap();

        assert_eq!(env.tasks().pending_microtasks(), 1);
        env.tasks().run_until_idle();
        assert_eq!(hits.get(), 1);
    }
}
