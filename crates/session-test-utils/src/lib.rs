//! # Session Test Utilities
//!
//! Mocks and fixtures for driving the session controller without a media SDK
//! or a backend.
//!
//! ## Modules
//!
//! - `mock_engine` - Recording media engine and its factory
//! - `mock_platform` - Recording video surfaces and scripted permissions
//! - `mock_backend` - Scripted token source and recording service
//! - `fixtures` - Canonical test values and a session builder
//!
//! ## Usage
//!
//! ```rust,ignore
//! use session_test_utils::*;
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_example() {
//!     let session = TestSession::builder()
//!         .with_token_source(MockTokenSource::pending())
//!         .spawn();
//!
//!     session.handle.start_join_flow().await.unwrap();
//!     session.wait_for(|s| s.join_attempted).await;
//!
//!     assert_eq!(session.engine.join_count(), 1);
//! }
//! ```

pub mod fixtures;
pub mod mock_backend;
pub mod mock_engine;
pub mod mock_platform;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_backend::*;
pub use mock_engine::*;
pub use mock_platform::*;
