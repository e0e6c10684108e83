//! Session Controller Library
//!
//! Coordinates a single participant's presence in a real-time audio/video
//! channel:
//!
//! - Fetches a channel access token from the token server
//! - Joins the channel through the media engine after a fixed delay
//! - Mirrors remote participant events onto video surfaces
//! - Starts and stops server-side cloud recording of the channel
//!
//! # Architecture
//!
//! ```text
//! SessionActorHandle (cloneable, used by the UI)
//! └── SessionActor (one task, plays the role of the UI thread)
//!     ├── owns SessionController (synchronous state machine)
//!     │   ├── EngineHandle -> dyn MediaEngine (external SDK)
//!     │   └── dyn VideoSurfaces (platform views)
//!     ├── spawns join race: token fetch vs join timer
//!     └── spawns recording start/stop calls, completions return via mailbox
//! ```
//!
//! Network completions and engine callbacks are posted to the actor's
//! mailbox, so all session state is mutated from one task.
//!
//! # Modules
//!
//! - [`actor`] - Session actor and its handle
//! - [`clients`] - Token and recording HTTP clients
//! - [`config`] - Configuration from environment
//! - [`controller`] - Session state machine
//! - [`engine`] - Media engine boundary
//! - [`errors`] - Error types
//! - [`headless`] - Logging stand-ins for the SDK and views
//! - [`platform`] - Video surface and permission boundaries
//! - [`session`] - Session data model

pub mod actor;
pub mod clients;
pub mod config;
pub mod controller;
pub mod engine;
pub mod errors;
pub mod headless;
pub mod platform;
pub mod session;
