//! Mutation watcher
//!
//! Folds host changes to an instance's own footprint into state
//! transitions. The watcher is `Unarmed` until connect, `Observing` while
//! connected, and `Unarmed` again after disconnect. Disarming disconnects
//! the observer, so batches the host already queued are never delivered.

use std::rc::Rc;

use tessera_core::{Machine, Transitions};
use tessera_host::{Document, HostEnv, HostError, MutationFilter, MutationRecord, NodeId, ObserverId};

/// Trigger invoked with `(state, host node, env)`; returns the next state
pub type Trigger<S> = Rc<dyn Fn(&Rc<S>, NodeId, &HostEnv) -> Rc<S>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WatchState {
    #[default]
    Unarmed,
    Observing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchInput {
    Arm,
    Disarm,
}

impl Transitions for WatchState {
    type Input = WatchInput;

    fn on_input(&self, input: WatchInput) -> Option<Self> {
        match (self, input) {
            (WatchState::Unarmed, WatchInput::Arm) => Some(WatchState::Observing),
            (WatchState::Observing, WatchInput::Disarm) => Some(WatchState::Unarmed),
            _ => None,
        }
    }
}

/// Host-change trigger and the filter it observes with
pub struct WatchConfig<S> {
    pub(crate) trigger: Trigger<S>,
    pub(crate) filter: MutationFilter,
    pub(crate) fire_on_connect: bool,
}

impl<S: 'static> WatchConfig<S> {
    /// Watch child-list, attribute and text changes across the subtree,
    /// firing once when first connected
    pub fn new<F>(trigger: F) -> Self
    where
        F: Fn(&Rc<S>, NodeId, &HostEnv) -> Rc<S> + 'static,
    {
        Self {
            trigger: Rc::new(trigger),
            filter: MutationFilter::all(),
            fire_on_connect: true,
        }
    }

    pub fn filter(mut self, filter: MutationFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Whether the first connect counts as an observed change
    pub fn fire_on_connect(mut self, enabled: bool) -> Self {
        self.fire_on_connect = enabled;
        self
    }

    pub fn trigger(&self) -> &Trigger<S> {
        &self.trigger
    }
}

/// Per-instance observer handle
#[derive(Debug)]
pub struct MutationWatcher {
    machine: Machine<WatchState>,
    observer: Option<ObserverId>,
}

impl Default for MutationWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationWatcher {
    pub fn new() -> Self {
        Self {
            machine: Machine::new(WatchState::Unarmed),
            observer: None,
        }
    }

    /// Install the observer; a no-op if already observing
    pub fn arm<F>(
        &mut self,
        doc: &mut Document,
        target: NodeId,
        filter: MutationFilter,
        on_batch: F,
    ) -> Result<bool, HostError>
    where
        F: Fn(&[MutationRecord]) + 'static,
    {
        if !self.machine.can_send(WatchInput::Arm) {
            return Ok(false);
        }
        let id = doc.observe(target, filter, on_batch)?;
        self.observer = Some(id);
        self.machine.send(WatchInput::Arm);
        tracing::debug!(?target, "watcher armed");
        Ok(true)
    }

    /// Disconnect the observer, dropping anything still queued for it
    pub fn disarm(&mut self, doc: &mut Document) -> bool {
        if self.machine.send(WatchInput::Disarm).is_none() {
            return false;
        }
        if let Some(id) = self.observer.take() {
            doc.disconnect_observer(id);
        }
        tracing::debug!("watcher disarmed");
        true
    }

    pub fn state(&self) -> WatchState {
        self.machine.current()
    }

    pub fn is_observing(&self) -> bool {
        self.machine.is_in(WatchState::Observing)
    }
}
