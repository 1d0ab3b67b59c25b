//! Tessera Host Platform
//!
//! A deterministic, in-process model of the platform components render into:
//!
//! - [`Document`]: node arena with elements, text and shadow roots
//! - [`VNode`]: candidate trees produced by render functions
//! - [`dispatch`]: capture/bubble listener dispatch across shadow boundaries
//! - [`observer`]: batched mutation observation delivered on microtasks
//! - [`patch`]: the leaf-level morph algorithm that patches a mounted tree
//! - [`form`]: form-association internals with validity flags
//! - [`HostEnv`]: the bundle handed to component handlers

pub mod dispatch;
pub mod document;
pub mod env;
pub mod error;
pub mod form;
pub mod node;
pub mod observer;
pub mod patch;
pub mod style;

pub use document::{Document, ListenerId, NodeData, NodeId};
pub use env::HostEnv;
pub use error::{HostError, Result};
pub use form::{FormInternals, ValidityFlags};
pub use node::{h, text, VElement, VNode};
pub use observer::{MutationCallback, MutationFilter, MutationKind, MutationRecord, ObserverId};
pub use style::StyleSource;
