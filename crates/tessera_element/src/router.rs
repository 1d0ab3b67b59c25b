//! Event routing
//!
//! Declared handlers are split once per component type into a local table
//! and a global table. Local handlers listen, capturing, on the instance's
//! shadow root; global handlers subscribe to the process-wide source. Both
//! are attached on connect and detached on disconnect through the
//! [`Subscriptions`] handle returned by [`RouteTable::attach`].

use std::rc::Rc;

use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tessera_core::events::event_types;
use tessera_core::{Event, EventChannel, SubscriptionId};
use tessera_host::{HostEnv, HostError, ListenerId, NodeId};

/// Handler invoked with `(state, event, env)`; returns the next state
pub type Handler<S> = Rc<dyn Fn(&Rc<S>, &mut Event, &HostEnv) -> Rc<S>>;

/// Which event names are process-wide and which have their default
/// action suppressed
#[derive(Clone, Debug)]
pub struct RouterConfig {
    global_events: FxHashSet<String>,
    prevent_default: FxHashSet<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            global_events: [event_types::POPSTATE, event_types::HASHCHANGE]
                .into_iter()
                .map(String::from)
                .collect(),
            prevent_default: [event_types::SUBMIT].into_iter().map(String::from).collect(),
        }
    }
}

impl RouterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve another name for the global channel
    pub fn global_event(mut self, name: impl Into<String>) -> Self {
        self.global_events.insert(name.into());
        self
    }

    /// Suppress the default action of another event name
    pub fn prevent_default(mut self, name: impl Into<String>) -> Self {
        self.prevent_default.insert(name.into());
        self
    }

    /// Channel for a handler; an explicit channel always wins
    pub fn channel_for(&self, name: &str, explicit: Option<EventChannel>) -> EventChannel {
        match explicit {
            Some(channel) => channel,
            None if self.global_events.contains(name) => EventChannel::Global,
            None => EventChannel::Local,
        }
    }

    pub fn should_prevent_default(&self, name: &str) -> bool {
        self.prevent_default.contains(name)
    }
}

/// A declared handler before partitioning
pub struct Route<S> {
    pub name: String,
    pub channel: Option<EventChannel>,
    pub handler: Handler<S>,
}

impl<S> Clone for Route<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            channel: self.channel,
            handler: Rc::clone(&self.handler),
        }
    }
}

/// Handlers partitioned by channel
pub struct RouteTable<S> {
    local: Vec<(String, Handler<S>)>,
    global: Vec<(String, Handler<S>)>,
    prevent_default: FxHashSet<String>,
}

impl<S: 'static> RouteTable<S> {
    pub fn partition(routes: &[Route<S>], config: &RouterConfig) -> Self {
        let mut table = Self {
            local: Vec::new(),
            global: Vec::new(),
            prevent_default: config.prevent_default.clone(),
        };
        for route in routes {
            let entry = (route.name.clone(), Rc::clone(&route.handler));
            match config.channel_for(&route.name, route.channel) {
                EventChannel::Local => table.local.push(entry),
                EventChannel::Global => table.global.push(entry),
            }
        }
        table
    }

    pub fn local_names(&self) -> impl Iterator<Item = &str> {
        self.local.iter().map(|(name, _)| name.as_str())
    }

    pub fn global_names(&self) -> impl Iterator<Item = &str> {
        self.global.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_empty() && self.global.is_empty()
    }

    /// Attach every handler
    ///
    /// `invoke` runs a handler against the instance and commits its result.
    /// Local listeners suppress default actions where configured and stop
    /// propagation before `invoke` runs.
    pub fn attach<F>(&self, env: &HostEnv, boundary: NodeId, invoke: F) -> Result<Subscriptions, HostError>
    where
        F: Fn(&Handler<S>, &mut Event) + Clone + 'static,
    {
        let mut subscriptions = Subscriptions::default();

        for (name, handler) in &self.local {
            let handler = Rc::clone(handler);
            let invoke = invoke.clone();
            let suppress = self.prevent_default.contains(name);
            let listener = env.doc_mut().add_listener(boundary, name, true, move |event| {
                if suppress {
                    event.prevent_default();
                }
                event.stop_propagation();
                invoke(&handler, event);
            });
            match listener {
                Ok(id) => subscriptions.listeners.push(id),
                Err(err) => {
                    subscriptions.detach(env);
                    return Err(err);
                }
            }
        }

        for (name, handler) in &self.global {
            let handler = Rc::clone(handler);
            let invoke = invoke.clone();
            let id = env.window().subscribe(name, move |event| invoke(&handler, event));
            subscriptions.globals.push(id);
        }

        tracing::debug!(
            local = subscriptions.listeners.len(),
            global = subscriptions.globals.len(),
            "routes attached"
        );
        Ok(subscriptions)
    }
}

/// Instance-scoped handles for everything [`RouteTable::attach`] installed
#[derive(Debug, Default)]
pub struct Subscriptions {
    listeners: SmallVec<[ListenerId; 4]>,
    globals: SmallVec<[SubscriptionId; 2]>,
}

impl Subscriptions {
    /// Remove every listener and subscription, returning how many were live
    pub fn detach(self, env: &HostEnv) -> usize {
        let mut removed = 0;
        {
            let mut doc = env.doc_mut();
            for id in &self.listeners {
                removed += usize::from(doc.remove_listener(*id));
            }
        }
        for id in &self.globals {
            removed += usize::from(env.window().unsubscribe(*id));
        }
        tracing::debug!(removed, "routes detached");
        removed
    }

    pub fn len(&self) -> usize {
        self.listeners.len() + self.globals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn route(name: &str, channel: Option<EventChannel>) -> Route<i32> {
        Route {
            name: name.to_string(),
            channel,
            handler: Rc::new(|s: &Rc<i32>, _: &mut Event, _: &HostEnv| Rc::new(**s + 1)),
        }
    }

    #[test]
    fn test_channel_defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.channel_for("click", None), EventChannel::Local);
        assert_eq!(config.channel_for("popstate", None), EventChannel::Global);
        assert_eq!(
            config.channel_for("popstate", Some(EventChannel::Local)),
            EventChannel::Local
        );
        assert_eq!(
            config.channel_for("click", Some(EventChannel::Global)),
            EventChannel::Global
        );
        assert!(config.should_prevent_default("submit"));
        assert!(!config.should_prevent_default("click"));
    }

    #[test]
    fn test_partition() {
        let config = RouterConfig::default().global_event("storage");
        let routes = vec![
            route("click", None),
            route("hashchange", None),
            route("storage", None),
            route("resize", Some(EventChannel::Global)),
        ];
        let table = RouteTable::partition(&routes, &config);
        assert_eq!(table.local_names().collect::<Vec<_>>(), vec!["click"]);
        assert_eq!(
            table.global_names().collect::<Vec<_>>(),
            vec!["hashchange", "storage", "resize"]
        );
    }

    #[test]
    fn test_local_listener_suppresses_and_stops() {
        let env = HostEnv::new();
        let (host, shadow, button) = {
            let mut doc = env.doc_mut();
            let root = doc.root();
            let host = doc.create_element("x-form");
            doc.append_child(root, host).unwrap();
            let shadow = doc.attach_shadow(host).unwrap();
            let button = doc.create_element("button");
            doc.append_child(shadow, button).unwrap();
            (host, shadow, button)
        };

        let inner_ran = Rc::new(RefCell::new(false));
        let flag = inner_ran.clone();
        env.doc_mut()
            .add_listener(button, "submit", false, move |_| *flag.borrow_mut() = true)
            .unwrap();

        let invoked = Rc::new(RefCell::new(Vec::new()));
        let log = invoked.clone();
        let table = RouteTable::partition(&[route("submit", None)], &RouterConfig::default());
        let subscriptions = table
            .attach(&env, shadow, move |_, event: &mut Event| {
                log.borrow_mut().push(event.name.clone())
            })
            .unwrap();
        assert_eq!(subscriptions.len(), 1);

        let mut event = Event::new("submit");
        let proceed = env.dispatch(button, &mut event).unwrap();
        assert!(!proceed);
        assert!(event.propagation_stopped());
        assert!(!*inner_ran.borrow());
        assert_eq!(*invoked.borrow(), vec!["submit".to_string()]);

        // Events at the host itself never reach the boundary
        env.dispatch(host, &mut Event::new("submit")).unwrap();
        assert_eq!(invoked.borrow().len(), 1);
    }

    #[test]
    fn test_detach_removes_global_subscription() {
        let env = HostEnv::new();
        let shadow = {
            let mut doc = env.doc_mut();
            let host = doc.create_element("x-nav");
            doc.attach_shadow(host).unwrap()
        };

        let hits = Rc::new(RefCell::new(0));
        let counter = hits.clone();
        let table = RouteTable::partition(&[route("popstate", None)], &RouterConfig::default());
        let subscriptions = table
            .attach(&env, shadow, move |_, _: &mut Event| *counter.borrow_mut() += 1)
            .unwrap();

        env.navigate("/a");
        assert_eq!(*hits.borrow(), 1);

        assert_eq!(subscriptions.detach(&env), 1);
        env.navigate("/b");
        assert_eq!(*hits.borrow(), 1);
        assert!(env.window().is_empty());
    }
}
