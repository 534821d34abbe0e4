//! Slack integration.
//!
//! The Slack app is where `flows_user` identities come from: an OAuth
//! installation yields the user id that flows are registered under.

pub mod client;
pub mod error;
pub mod types;

pub use client::SlackClient;
pub use error::SlackError;
pub use types::{AuthedTeam, Channel};
