//! Tessera Core Runtime
//!
//! This crate provides the foundational primitives for Tessera components:
//!
//! - **State Cells**: Identity-checked, wholesale state replacement
//! - **Task Queue**: Cooperative single-threaded macrotask/microtask queue
//! - **Event Dispatch**: Events, routing channels and the process-wide event source
//! - **Lifecycle Machines**: Small typed state machines with transition history
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use tessera_core::{StateCell, TaskQueue};
//!
//! let queue = TaskQueue::new();
//! let mut cell = StateCell::new(0i32);
//!
//! // Replacing with a fresh value commits a transition
//! let transition = cell.commit(Rc::new(1)).unwrap();
//! assert_eq!((*transition.old, *transition.new), (0, 1));
//!
//! // Committing the same reference is a no-op
//! let same = cell.snapshot();
//! assert!(cell.commit(same).is_none());
//!
//! queue.defer(|| println!("runs on the next turn"));
//! assert_eq!(queue.run_until_idle(), 1);
//! ```

pub mod error;
pub mod events;
pub mod lifecycle;
pub mod scheduler;
pub mod state;
pub mod value;

pub use error::{PropertyError, Result};
pub use events::{Event, EventChannel, EventDispatcher, EventHandler, SubscriptionId};
pub use lifecycle::{LifecycleInput, LifecycleState, Machine, Transitions};
pub use scheduler::{Task, TaskQueue};
pub use state::{RedrawSlot, StateCell, Transition};
pub use value::PropValue;
