//! Tessera Component Runtime
//!
//! Stateful, encapsulated components on top of the Tessera host platform.
//! A component type is declared once as a [`ComponentDef`]; each
//! [`Component`] instance owns a single state value and keeps its shadow
//! tree, its event routes and its derived events in step with it.
//!
//! - **Scheduling**: commits are identity-checked and coalesced into one
//!   deferred redraw per task-queue turn
//! - **Reconciliation**: equal trees are skipped, kind changes replace,
//!   everything else is morphed in place
//! - **Event routing**: local handlers on the shadow root, global handlers
//!   on the process-wide source while connected
//! - **Emission**: declarative `(old, new)` predicates that synthesize events
//! - **Host changes**: an optional mutation watcher folding host edits into state
//! - **Forms**: submission value and validity pushed to the host
//! - **Properties**: live read projections and guarded writes
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use tessera_core::Event;
//! use tessera_element::{Component, ComponentDef};
//! use tessera_host::{h, HostEnv};
//!
//! let def = ComponentDef::builder("x-counter", 0i64, |n: &i64| {
//!     h("button").text(format!("{n}")).into()
//! })
//! .on("increment", |n, _, _| Rc::new(**n + 1))
//! .build();
//!
//! let env = HostEnv::new();
//! let counter = Component::new(def, &env).unwrap();
//! let body = env.doc().root();
//! counter.attach_to(body).unwrap();
//!
//! counter.dispatch_local(&mut Event::new("increment")).unwrap();
//! assert_eq!(*counter.state(), 1);
//!
//! // The redraw lands on the next turn
//! env.tasks().run_until_idle();
//! assert_eq!(counter.redraws(), 1);
//! ```

pub mod component;
pub mod definition;
pub mod emit;
pub mod error;
pub mod form;
pub mod props;
pub mod reconcile;
pub mod router;
pub mod watch;

pub use component::Component;
pub use definition::{ComponentBuilder, ComponentDef, Render, ViewUpdated};
pub use emit::{EmitRecord, Emissions};
pub use error::{ElementError, Result};
pub use form::{FormFns, FormParticipant, FormSync, Validation};
pub use props::{Property, PropertyTable};
pub use reconcile::Reconciled;
pub use router::{Handler, Route, RouteTable, RouterConfig, Subscriptions};
pub use watch::{MutationWatcher, Trigger, WatchConfig, WatchInput, WatchState};
