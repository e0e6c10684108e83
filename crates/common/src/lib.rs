//! Common types shared by the cloud recording demo crates.

#![warn(clippy::pedantic)]

/// Module for channel and identity types
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;
