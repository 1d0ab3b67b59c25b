//! Component instances
//!
//! A [`Component`] owns one state value and drives the rest of the runtime
//! from it. Every state change goes through `commit`:
//!
//! 1. The state cell swaps in the new value (identical values are a no-op)
//! 2. Emission records are evaluated against `(old, new)`
//! 3. A redraw is deferred unless one is already pending
//! 4. Form data is pushed, when the component is form-associated
//! 5. Emitted events are dispatched on their channels
//!
//! The redraw runs on a later task-queue turn and always renders whatever
//! state is current by then. No borrow of the instance is held while user
//! handlers, triggers or hooks run, so they may commit again freely.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tessera_core::{
    Event, EventChannel, LifecycleInput, LifecycleState, Machine, PropValue, RedrawSlot, StateCell,
};
use tessera_host::{HostEnv, NodeId};

use crate::definition::ComponentDef;
use crate::emit;
use crate::error::{ElementError, Result};
use crate::form::FormSync;
use crate::reconcile;
use crate::router::{Handler, Subscriptions};
use crate::watch::{MutationWatcher, Trigger, WatchState};

/// A live component instance
///
/// Cloning yields another handle to the same instance.
pub struct Component<S> {
    inner: Rc<Inner<S>>,
}

impl<S> Clone for Component<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

struct Inner<S> {
    def: Rc<ComponentDef<S>>,
    env: HostEnv,
    host: NodeId,
    runtime: RefCell<Runtime<S>>,
}

struct Runtime<S> {
    cell: StateCell<S>,
    redraw: RedrawSlot,
    lifecycle: Machine<LifecycleState>,
    root: Option<NodeId>,
    routes: Option<Subscriptions>,
    watcher: MutationWatcher,
    form: Option<FormSync>,
    redraws: u64,
}

impl<S: fmt::Debug + 'static> Component<S> {
    /// Create an instance and its host element
    ///
    /// The element is not inserted anywhere; the host decides where it
    /// lives and calls [`connect`](Self::connect) once it is mounted.
    pub fn new(def: Rc<ComponentDef<S>>, env: &HostEnv) -> Result<Self> {
        let state = def.initial_state(env);
        let host = {
            let mut doc = env.doc_mut();
            let host = doc.create_element(def.tag());
            if def.is_form_associated() {
                doc.attach_internals(host)?;
            }
            host
        };

        let inner = Rc::new(Inner {
            runtime: RefCell::new(Runtime {
                cell: StateCell::from_rc(state),
                redraw: RedrawSlot::new(),
                lifecycle: Machine::new(LifecycleState::Created),
                root: None,
                routes: None,
                watcher: MutationWatcher::new(),
                form: def.is_form_associated().then(FormSync::new),
                redraws: 0,
            }),
            def,
            env: env.clone(),
            host,
        });
        inner.sync_form();
        tracing::debug!(tag = %inner.def.tag, ?host, "component created");
        Ok(Self { inner })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Mount hook: render into the shadow root and attach behaviors
    pub fn connect(&self) -> Result<()> {
        self.inner.connect()
    }

    /// Unmount hook: clear the shadow root and detach behaviors
    pub fn disconnect(&self) -> Result<()> {
        self.inner.disconnect()
    }

    /// Insert the host element under `parent` and connect
    pub fn attach_to(&self, parent: NodeId) -> Result<()> {
        self.inner.env.doc_mut().append_child(parent, self.inner.host)?;
        self.connect()
    }

    /// Remove the host element from its parent and disconnect
    pub fn detach(&self) -> Result<()> {
        {
            let mut doc = self.inner.env.doc_mut();
            if let Some(parent) = doc.parent(self.inner.host) {
                doc.remove_child(parent, self.inner.host)?;
            }
        }
        self.disconnect()
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Replace the state; a no-op when `next` is the current value
    pub fn commit(&self, next: Rc<S>) {
        self.inner.commit(next);
    }

    pub fn set_state(&self, next: S) {
        self.commit(Rc::new(next));
    }

    /// The current state
    pub fn state(&self) -> Rc<S> {
        self.inner.state()
    }

    /// Number of committed transitions
    pub fn transitions(&self) -> u64 {
        self.inner.runtime.borrow().cell.commits()
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Read a projected property from the current state
    pub fn get(&self, name: &str) -> Result<PropValue> {
        let state = self.state();
        Ok(self.inner.def.props.read(name, &state)?)
    }

    /// Write a projected property, committing the state its setter derives
    pub fn set(&self, name: &str, value: impl Into<PropValue>) -> Result<()> {
        let state = self.state();
        let next = self.inner.def.props.write(name, &state, value.into())?;
        self.commit(Rc::new(next));
        Ok(())
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.inner.def.props.names()
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Dispatch an event inside the shadow root, as a user interaction would
    ///
    /// Returns `Ok(false)` if the default action was suppressed.
    pub fn dispatch_local(&self, event: &mut Event) -> Result<bool> {
        let root = self
            .root()
            .ok_or_else(|| ElementError::NotConnected(self.inner.def.tag.clone()))?;
        Ok(self.inner.env.dispatch(root, event)?)
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn def(&self) -> &Rc<ComponentDef<S>> {
        &self.inner.def
    }

    pub fn env(&self) -> &HostEnv {
        &self.inner.env
    }

    /// The host element
    pub fn host(&self) -> NodeId {
        self.inner.host
    }

    /// The mounted root inside the shadow root, while connected
    pub fn root(&self) -> Option<NodeId> {
        self.inner.runtime.borrow().root
    }

    pub fn shadow_root(&self) -> Option<NodeId> {
        self.inner.env.doc().shadow_root(self.inner.host)
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.inner.runtime.borrow().lifecycle.current()
    }

    pub fn lifecycle_history(&self) -> Vec<(LifecycleState, LifecycleInput, LifecycleState)> {
        self.inner.runtime.borrow().lifecycle.history().to_vec()
    }

    pub fn is_connected(&self) -> bool {
        self.lifecycle().is_connected()
    }

    pub fn watcher_state(&self) -> WatchState {
        self.inner.runtime.borrow().watcher.state()
    }

    /// Whether a deferred redraw is waiting to run
    pub fn redraw_pending(&self) -> bool {
        self.inner.runtime.borrow().redraw.is_pending()
    }

    /// Number of redraw passes that reached the reconciler
    pub fn redraws(&self) -> u64 {
        self.inner.runtime.borrow().redraws
    }
}

impl<S: fmt::Debug + 'static> Inner<S> {
    fn state(&self) -> Rc<S> {
        self.runtime.borrow().cell.snapshot()
    }

    fn commit(self: &Rc<Self>, next: Rc<S>) {
        let (emissions, schedule) = {
            let mut rt = self.runtime.borrow_mut();
            let Some(transition) = rt.cell.commit(next) else {
                tracing::trace!(tag = %self.def.tag, "commit skipped, state identical");
                return;
            };
            if self.def.debug {
                tracing::info!(
                    target: "tessera::transition",
                    tag = %self.def.tag,
                    old = ?transition.old,
                    new = ?transition.new,
                    "transition"
                );
            }
            let emissions = emit::evaluate(&self.def.emits, &*transition.old, &*transition.new);
            (emissions, rt.redraw.request())
        };

        if schedule {
            let weak = Rc::downgrade(self);
            self.env.tasks().defer(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.redraw();
                }
            });
            tracing::trace!(tag = %self.def.tag, "redraw scheduled");
        }

        self.sync_form();

        for (channel, mut event) in emissions {
            match channel {
                EventChannel::Local => {
                    if let Err(err) = self.env.dispatch(self.host, &mut event) {
                        tracing::warn!(%err, event = %event.name, "emitted event not dispatched");
                    }
                }
                EventChannel::Global => {
                    self.env.window().dispatch(&mut event);
                }
            }
        }
    }

    fn redraw(self: &Rc<Self>) {
        let (state, root) = {
            let mut rt = self.runtime.borrow_mut();
            if !rt.redraw.take() {
                return;
            }
            match rt.root {
                Some(root) if rt.lifecycle.current().is_connected() => (rt.cell.snapshot(), root),
                _ => {
                    tracing::trace!(tag = %self.def.tag, "redraw skipped, not mounted");
                    return;
                }
            }
        };

        let candidate = (self.def.render)(&*state);
        let outcome = reconcile::reconcile(&mut self.env.doc_mut(), root, &candidate);
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(tag = %self.def.tag, %err, "redraw failed");
                return;
            }
        };

        {
            let mut rt = self.runtime.borrow_mut();
            rt.redraws += 1;
            rt.root = Some(outcome.root(root));
        }
        tracing::trace!(tag = %self.def.tag, ?outcome, "redrawn");

        if outcome.changed() {
            self.run_view_updated();
        }
    }

    fn run_view_updated(self: &Rc<Self>) {
        let Some(hook) = self.def.view_updated.as_ref() else {
            return;
        };
        let (state, root) = {
            let rt = self.runtime.borrow();
            match rt.root {
                Some(root) => (rt.cell.snapshot(), root),
                None => return,
            }
        };
        let next = hook(&state, root, &self.env);
        self.commit(next);
    }

    fn handle(self: &Rc<Self>, handler: &Handler<S>, event: &mut Event) {
        let state = self.state();
        let next = handler(&state, event, &self.env);
        self.commit(next);
    }

    fn fire_trigger(self: &Rc<Self>, trigger: &Trigger<S>) {
        let state = self.state();
        let next = trigger(&state, self.host, &self.env);
        self.commit(next);
    }

    fn sync_form(&self) {
        let Some(participant) = self.def.form.as_deref() else {
            return;
        };
        let mut guard = self.runtime.borrow_mut();
        let rt = &mut *guard;
        let connected = rt.lifecycle.current().is_connected();
        let Some(sync) = rt.form.as_mut() else {
            return;
        };
        let mut doc = self.env.doc_mut();
        match doc.internals_mut(self.host) {
            Ok(internals) => {
                sync.sync(participant, &**rt.cell.get(), internals, connected);
            }
            Err(err) => tracing::warn!(tag = %self.def.tag, %err, "form sync skipped"),
        }
    }

    fn connect(self: &Rc<Self>) -> Result<()> {
        let first = {
            let rt = self.runtime.borrow();
            if !rt.lifecycle.can_send(LifecycleInput::Connect) {
                return Ok(());
            }
            rt.lifecycle.is_in(LifecycleState::Created)
        };

        // Host work first; the lifecycle only moves once it all succeeded
        let (root, routes) = match self.mount_host() {
            Ok(mounted) => mounted,
            Err(err) => {
                tracing::warn!(tag = %self.def.tag, %err, "connect failed");
                if let Err(cleanup) = self.clear_shadow() {
                    tracing::warn!(tag = %self.def.tag, err = %cleanup, "shadow cleanup failed");
                }
                return Err(err);
            }
        };
        {
            let mut rt = self.runtime.borrow_mut();
            rt.lifecycle.send(LifecycleInput::Connect);
            rt.root = Some(root);
            rt.routes = Some(routes);
        }
        tracing::debug!(tag = %self.def.tag, first, "connect");

        self.sync_form();

        if let Some(watch) = &self.def.watch {
            if first && watch.fire_on_connect {
                self.fire_trigger(watch.trigger());
            }
        }

        self.run_view_updated();
        Ok(())
    }

    /// Render into the shadow root, attach routes and arm the watcher
    fn mount_host(self: &Rc<Self>) -> Result<(NodeId, Subscriptions)> {
        let state = self.state();
        let candidate = (self.def.render)(&*state);
        let (shadow, root) = {
            let mut doc = self.env.doc_mut();
            let shadow = doc.attach_shadow(self.host)?;
            for style in &self.def.styles {
                doc.adopt_style(shadow, style.clone())?;
            }
            let root = reconcile::mount(&mut doc, shadow, &candidate)?;
            (shadow, root)
        };

        let weak = Rc::downgrade(self);
        let routes = self.def.routes.attach(&self.env, shadow, move |handler, event| {
            if let Some(inner) = weak.upgrade() {
                inner.handle(handler, event);
            }
        })?;

        if let Some(watch) = &self.def.watch {
            let weak = Rc::downgrade(self);
            let trigger = Rc::clone(watch.trigger());
            let armed = self.runtime.borrow_mut().watcher.arm(
                &mut self.env.doc_mut(),
                self.host,
                watch.filter.clone(),
                move |records| {
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    if !inner.runtime.borrow().watcher.is_observing() {
                        return;
                    }
                    tracing::trace!(records = records.len(), "host change observed");
                    inner.fire_trigger(&trigger);
                },
            );
            if let Err(err) = armed {
                routes.detach(&self.env);
                return Err(err.into());
            }
        }

        Ok((root, routes))
    }

    fn disconnect(&self) -> Result<()> {
        let routes = {
            let mut rt = self.runtime.borrow_mut();
            if rt.lifecycle.send(LifecycleInput::Disconnect).is_none() {
                return Ok(());
            }
            rt.watcher.disarm(&mut self.env.doc_mut());
            rt.root = None;
            rt.routes.take()
        };
        tracing::debug!(tag = %self.def.tag, "disconnect");

        if let Some(routes) = routes {
            routes.detach(&self.env);
        }
        self.clear_shadow()
    }

    fn clear_shadow(&self) -> Result<()> {
        let mut doc = self.env.doc_mut();
        if let Some(shadow) = doc.shadow_root(self.host) {
            for child in doc.clear_children(shadow)? {
                doc.discard(child);
            }
            doc.clear_styles(shadow);
        }
        Ok(())
    }
}

impl<S: fmt::Debug + 'static> fmt::Debug for Component<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rt = self.inner.runtime.borrow();
        f.debug_struct("Component")
            .field("tag", &self.inner.def.tag)
            .field("host", &self.inner.host)
            .field("state", rt.cell.get())
            .field("lifecycle", &rt.lifecycle.current())
            .field("redraw_pending", &rt.redraw.is_pending())
            .finish()
    }
}
