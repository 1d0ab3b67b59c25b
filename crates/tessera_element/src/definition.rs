//! Component definitions
//!
//! A [`ComponentDef`] is the capability table for one component type:
//! everything an instance needs besides its own state. It is assembled with
//! a [`ComponentBuilder`] and frozen into an `Rc` shared by every instance.
//!
//! ```rust
//! use std::rc::Rc;
//! use tessera_core::Event;
//! use tessera_element::ComponentDef;
//! use tessera_host::h;
//!
//! let counter = ComponentDef::builder("x-counter", 0i64, |n: &i64| {
//!     h("button").text(format!("Clicked {n} times")).into()
//! })
//! .on("click", |n, _, _| Rc::new(**n + 1))
//! .emit(|old, new| old < &10 && new >= &10, |n| Event::new("milestone").with_detail(*n))
//! .build();
//!
//! assert_eq!(counter.tag(), "x-counter");
//! ```

use std::fmt;
use std::rc::Rc;

use tessera_core::{Event, EventChannel};
use tessera_host::{HostEnv, NodeId, StyleSource, VNode};

use crate::emit::EmitRecord;
use crate::form::FormParticipant;
use crate::props::{Property, PropertyTable};
use crate::router::{Handler, Route, RouteTable, RouterConfig};
use crate::watch::WatchConfig;

/// Pure mapping from state to a candidate tree
pub type Render<S> = Box<dyn Fn(&S) -> VNode>;

/// Post-redraw hook invoked with `(state, mounted root, env)`
pub type ViewUpdated<S> = Rc<dyn Fn(&Rc<S>, NodeId, &HostEnv) -> Rc<S>>;

enum Initial<S> {
    Value(Rc<S>),
    Factory(Box<dyn Fn(&HostEnv) -> S>),
}

/// Frozen per-type configuration
pub struct ComponentDef<S> {
    pub(crate) tag: String,
    initial: Initial<S>,
    pub(crate) render: Render<S>,
    pub(crate) routes: RouteTable<S>,
    pub(crate) emits: Vec<EmitRecord<S>>,
    pub(crate) watch: Option<WatchConfig<S>>,
    pub(crate) props: PropertyTable<S>,
    pub(crate) view_updated: Option<ViewUpdated<S>>,
    pub(crate) debug: bool,
    pub(crate) styles: Vec<StyleSource>,
    pub(crate) form: Option<Box<dyn FormParticipant<S>>>,
}

impl<S: 'static> ComponentDef<S> {
    /// Start a definition seeded from a literal state
    pub fn builder<R>(tag: impl Into<String>, initial: S, render: R) -> ComponentBuilder<S>
    where
        R: Fn(&S) -> VNode + 'static,
    {
        ComponentBuilder::new(tag.into(), Initial::Value(Rc::new(initial)), Box::new(render))
    }

    /// Start a definition whose state is produced per instance from the
    /// host environment
    pub fn builder_with_factory<F, R>(tag: impl Into<String>, factory: F, render: R) -> ComponentBuilder<S>
    where
        F: Fn(&HostEnv) -> S + 'static,
        R: Fn(&S) -> VNode + 'static,
    {
        ComponentBuilder::new(tag.into(), Initial::Factory(Box::new(factory)), Box::new(render))
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Seed state for a new instance
    pub fn initial_state(&self, env: &HostEnv) -> Rc<S> {
        match &self.initial {
            Initial::Value(state) => Rc::clone(state),
            Initial::Factory(factory) => Rc::new(factory(env)),
        }
    }

    pub fn routes(&self) -> &RouteTable<S> {
        &self.routes
    }

    pub fn properties(&self) -> &PropertyTable<S> {
        &self.props
    }

    pub fn is_form_associated(&self) -> bool {
        self.form.is_some()
    }

    pub fn is_watching(&self) -> bool {
        self.watch.is_some()
    }
}

impl<S> fmt::Debug for ComponentDef<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDef")
            .field("tag", &self.tag)
            .field("emits", &self.emits.len())
            .field("props", &self.props.len())
            .field("watch", &self.watch.is_some())
            .field("form", &self.form.is_some())
            .field("debug", &self.debug)
            .finish()
    }
}

/// Builder for [`ComponentDef`]
pub struct ComponentBuilder<S> {
    tag: String,
    initial: Initial<S>,
    render: Render<S>,
    routes: Vec<Route<S>>,
    router: RouterConfig,
    emits: Vec<EmitRecord<S>>,
    watch: Option<WatchConfig<S>>,
    props: PropertyTable<S>,
    view_updated: Option<ViewUpdated<S>>,
    debug: bool,
    styles: Vec<StyleSource>,
    form: Option<Box<dyn FormParticipant<S>>>,
}

impl<S: 'static> ComponentBuilder<S> {
    fn new(tag: String, initial: Initial<S>, render: Render<S>) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            initial,
            render,
            routes: Vec::new(),
            router: RouterConfig::default(),
            emits: Vec::new(),
            watch: None,
            props: PropertyTable::default(),
            view_updated: None,
            debug: false,
            styles: Vec::new(),
            form: None,
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Handle an event on its default channel
    pub fn on<F>(self, event: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Rc<S>, &mut Event, &HostEnv) -> Rc<S> + 'static,
    {
        self.route(event.into(), None, Rc::new(handler))
    }

    /// Handle an event from the process-wide source
    pub fn on_global<F>(self, event: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Rc<S>, &mut Event, &HostEnv) -> Rc<S> + 'static,
    {
        self.route(event.into(), Some(EventChannel::Global), Rc::new(handler))
    }

    /// Handle an event on an explicit channel
    pub fn on_channel<F>(self, event: impl Into<String>, channel: EventChannel, handler: F) -> Self
    where
        F: Fn(&Rc<S>, &mut Event, &HostEnv) -> Rc<S> + 'static,
    {
        self.route(event.into(), Some(channel), Rc::new(handler))
    }

    fn route(mut self, name: String, channel: Option<EventChannel>, handler: Handler<S>) -> Self {
        self.routes.push(Route {
            name,
            channel,
            handler,
        });
        self
    }

    /// Replace the reserved global and default-suppressed event names
    pub fn router(mut self, config: RouterConfig) -> Self {
        self.router = config;
        self
    }

    // =========================================================================
    // Emission
    // =========================================================================

    /// Emit one event on the instance whenever `when(old, new)` holds
    pub fn emit<P, E>(self, when: P, emit: E) -> Self
    where
        P: Fn(&S, &S) -> bool + 'static,
        E: Fn(&S) -> Event + 'static,
    {
        self.emit_record(EmitRecord::new(when, emit))
    }

    /// Emit a batch of events on the instance whenever `when(old, new)` holds
    pub fn emit_many<P, E>(self, when: P, emit: E) -> Self
    where
        P: Fn(&S, &S) -> bool + 'static,
        E: Fn(&S) -> Vec<Event> + 'static,
    {
        self.emit_record(EmitRecord::many(when, emit))
    }

    /// Emit one event on the process-wide source
    pub fn emit_global<P, E>(self, when: P, emit: E) -> Self
    where
        P: Fn(&S, &S) -> bool + 'static,
        E: Fn(&S) -> Event + 'static,
    {
        self.emit_record(EmitRecord::new(when, emit).global())
    }

    pub fn emit_record(mut self, record: EmitRecord<S>) -> Self {
        self.emits.push(record);
        self
    }

    // =========================================================================
    // Host changes, properties and hooks
    // =========================================================================

    /// Fold host changes into state with the default filter
    pub fn domchange<F>(self, trigger: F) -> Self
    where
        F: Fn(&Rc<S>, NodeId, &HostEnv) -> Rc<S> + 'static,
    {
        self.watch(WatchConfig::new(trigger))
    }

    pub fn watch(mut self, config: WatchConfig<S>) -> Self {
        self.watch = Some(config);
        self
    }

    pub fn prop(mut self, name: impl Into<String>, property: Property<S>) -> Self {
        self.props.insert(name, property);
        self
    }

    /// Run after every redraw that changed the tree, and once on connect
    pub fn view_updated<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Rc<S>, NodeId, &HostEnv) -> Rc<S> + 'static,
    {
        self.view_updated = Some(Rc::new(hook));
        self
    }

    /// Log every committed transition
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    pub fn style(mut self, style: StyleSource) -> Self {
        self.styles.push(style);
        self
    }

    /// Make instances form-associated
    pub fn form<P>(mut self, participant: P) -> Self
    where
        P: FormParticipant<S> + 'static,
    {
        self.form = Some(Box::new(participant));
        self
    }

    pub fn build(self) -> Rc<ComponentDef<S>> {
        let routes = RouteTable::partition(&self.routes, &self.router);
        tracing::debug!(
            tag = %self.tag,
            local = routes.local_names().count(),
            global = routes.global_names().count(),
            emits = self.emits.len(),
            props = self.props.len(),
            "component defined"
        );
        Rc::new(ComponentDef {
            tag: self.tag,
            initial: self.initial,
            render: self.render,
            routes,
            emits: self.emits,
            watch: self.watch,
            props: self.props,
            view_updated: self.view_updated,
            debug: self.debug,
            styles: self.styles,
            form: self.form,
        })
    }
}
