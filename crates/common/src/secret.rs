//! Secret types for protecting credentials from accidental logging.
//!
//! Re-exports [`secrecy`] types. Channel access tokens issued by the token
//! server and the media engine app id are held as [`SecretString`], so any
//! struct deriving `Debug` around them prints `[REDACTED]` instead of the
//! value, and tracing fields built from `{:?}` are safe.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct Grant {
//!     channel: String,
//!     token: SecretString,
//! }
//!
//! let grant = Grant {
//!     channel: "demo".to_string(),
//!     token: SecretString::from("abc123"),
//! };
//!
//! assert!(!format!("{grant:?}").contains("abc123"));
//! assert_eq!(grant.token.expose_secret(), "abc123");
//! ```

pub use secrecy::{ExposeSecret, SecretString};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_debug_is_redacted() {
        let token = SecretString::from("006abc-rtc-token");
        let debug_str = format!("{token:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("006abc"));
    }

    #[test]
    fn test_deserialize_token_field() {
        #[derive(Debug, Deserialize)]
        struct TokenBody {
            rtc_token: SecretString,
        }

        let body: TokenBody =
            serde_json::from_str(r#"{"rtc_token": "abc123"}"#).expect("deserialize");

        assert_eq!(body.rtc_token.expose_secret(), "abc123");
        assert!(!format!("{body:?}").contains("abc123"));
    }
}
