//! Slack-related errors.

use thiserror::Error;

/// Errors that can occur when talking to Slack.
#[derive(Debug, Error)]
pub enum SlackError {
    /// HTTP request failed.
    #[error("Slack request failed: {0}")]
    Request(String),

    /// Failed to parse the response.
    #[error("Slack response error: {0}")]
    Response(String),

    /// Slack returned `ok: false`.
    #[error("Slack API error: {0}")]
    Api(String),
}
