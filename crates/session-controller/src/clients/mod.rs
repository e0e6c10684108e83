//! HTTP clients for the token server and the cloud recording service.
//!
//! Both services live behind the same base URL and speak plain JSON with no
//! authentication. Calls are not retried and use reqwest's default timeouts.

pub mod recording_client;
pub mod token_client;

pub use recording_client::{RecordingClient, RecordingClientError, RecordingService};
pub use token_client::{TokenClient, TokenClientError, TokenGrant, TokenSource};

use reqwest::Url;

/// Media type sent with every POST body.
pub const JSON_UTF8: &str = "application/json; charset=utf-8";

/// Maximum length for error body in error messages.
const MAX_ERROR_BODY_LEN: usize = 256;

/// Truncate an error response body for inclusion in an error message.
fn truncate_error_body(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_LEN {
        let head: String = body.chars().take(MAX_ERROR_BODY_LEN).collect();
        format!("{head}...[truncated]")
    } else {
        body.to_string()
    }
}

/// Parse the backend base URL.
fn parse_base_url(base_url: &str) -> Result<Url, String> {
    let url = Url::parse(base_url).map_err(|e| format!("invalid base URL {base_url}: {e}"))?;
    if url.cannot_be_a_base() {
        return Err(format!("base URL {base_url} cannot carry a path"));
    }
    Ok(url)
}

/// Append path segments to the base URL, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
