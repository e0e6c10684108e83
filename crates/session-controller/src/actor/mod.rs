//! Session actor.
//!
//! ```text
//! SessionActorHandle (cloneable)
//! └── SessionActor (single task)
//!     ├── owns SessionController
//!     ├── join race task: token fetch vs join timer
//!     └── recording tasks: one per start/stop call
//! ```
//!
//! Spawned tasks never touch session state. They post their results back to
//! the actor's mailbox, and engine callbacks arrive through the engine event
//! queue, so every mutation happens on the actor task in arrival order.
//!
//! # Modules
//!
//! - [`messages`] - Mailbox message types
//! - [`session`] - `SessionActor`, its handle and the join race

pub mod messages;
pub mod session;

pub use messages::SessionMessage;
pub use session::{SessionActor, SessionActorHandle, SessionDeps, SessionSettings};
