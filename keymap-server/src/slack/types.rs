//! Slack Web API payloads.

use serde::{Deserialize, Serialize};

/// Response of `oauth.v2.access`.
#[derive(Debug, Deserialize)]
pub struct OAuthAccessResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// Bot token for the installing workspace
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub authed_user: Option<AuthedUser>,
}

/// The user who completed the OAuth flow.
#[derive(Debug, Deserialize)]
pub struct AuthedUser {
    pub id: String,
    /// User token, present when user scopes were requested
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Response of `auth.test`.
#[derive(Debug, Deserialize)]
pub struct AuthTestResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// Workspace URL, e.g. `https://acme.slack.com/`
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
}

/// Response of `conversations.list`.
#[derive(Debug, Deserialize)]
pub struct ConversationsListResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

/// A conversation. Direct messages have no name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Request body of `chat.postMessage`.
#[derive(Debug, Serialize)]
pub struct PostMessageRequest<'a> {
    pub channel: &'a str,
    pub text: &'a str,
}

/// Response of `chat.postMessage`.
#[derive(Debug, Deserialize)]
pub struct PostMessageResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

/// Outcome of a completed OAuth installation.
///
/// `user_id` is what the registry receives as `flows_user`.
#[derive(Clone)]
pub struct AuthedTeam {
    pub user_id: String,
    /// Workspace subdomain
    pub team: String,
    pub team_id: String,
    pub access_token: String,
}

impl std::fmt::Debug for AuthedTeam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthedTeam")
            .field("user_id", &self.user_id)
            .field("team", &self.team)
            .field("team_id", &self.team_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}
