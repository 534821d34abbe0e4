//! Slack Web API client.
//!
//! Covers the OAuth installation exchange plus the two calls flows use to
//! talk back to a workspace: channel lookup and message posting.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use super::error::SlackError;
use super::types::{
    AuthTestResponse, AuthedTeam, Channel, ConversationsListResponse, OAuthAccessResponse,
    PostMessageRequest, PostMessageResponse,
};
use crate::Config;

/// Conversation types searched by [`SlackClient::find_channel`].
const CHANNEL_TYPES: &str = "public_channel,private_channel,im";

/// Slack API client bound to one Slack app.
#[derive(Clone)]
pub struct SlackClient {
    client: Client,
    api_base: String,
    client_id: String,
    client_secret: String,
    redirect_uri: Option<String>,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("api_base", &self.api_base)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

impl SlackClient {
    pub fn new(
        api_base: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SlackError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SlackError::Request(e.to_string()))?;

        Ok(Self {
            client,
            api_base: api_base.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri,
        })
    }

    /// Build a client from configuration, or `None` when Slack is not configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, SlackError> {
        match (&config.slack_client_id, &config.slack_client_secret) {
            (Some(id), Some(secret)) => Self::new(
                config.slack_api_base.clone(),
                id.clone(),
                secret.clone(),
                config.slack_redirect_uri.clone(),
                config.request_timeout(),
            )
            .map(Some),
            _ => Ok(None),
        }
    }

    /// Exchange an OAuth authorization code for the installing user and workspace.
    pub async fn exchange_code(&self, code: &str) -> Result<AuthedTeam, SlackError> {
        let mut query = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
        ];
        if let Some(redirect_uri) = &self.redirect_uri {
            query.push(("redirect_uri", redirect_uri.as_str()));
        }

        let access: OAuthAccessResponse = self
            .send(self.client.get(self.url("oauth.v2.access")).query(&query))
            .await?;
        check_ok(access.ok, access.error, "oauth.v2.access")?;

        let authed_user = access
            .authed_user
            .ok_or_else(|| SlackError::Response("missing authed_user".to_string()))?;
        let user_token = authed_user
            .access_token
            .ok_or_else(|| SlackError::Response("missing authed_user.access_token".to_string()))?;
        let access_token = access
            .access_token
            .ok_or_else(|| SlackError::Response("missing access_token".to_string()))?;

        let auth: AuthTestResponse = self
            .send(self.client.get(self.url("auth.test")).bearer_auth(&user_token))
            .await?;
        check_ok(auth.ok, auth.error, "auth.test")?;

        let team = auth
            .url
            .as_deref()
            .and_then(team_from_url)
            .ok_or_else(|| SlackError::Response("unrecognised workspace url".to_string()))?;
        let team_id = auth
            .team_id
            .ok_or_else(|| SlackError::Response("missing team_id".to_string()))?;

        info!(user_id = %authed_user.id, team = %team, team_id = %team_id, "slack_oauth_complete");

        Ok(AuthedTeam {
            user_id: authed_user.id,
            team,
            team_id,
            access_token,
        })
    }

    /// Find a conversation in the workspace by name.
    pub async fn find_channel(
        &self,
        access_token: &str,
        team_id: &str,
        name: &str,
    ) -> Result<Option<Channel>, SlackError> {
        let list: ConversationsListResponse = self
            .send(
                self.client
                    .get(self.url("conversations.list"))
                    .bearer_auth(access_token)
                    .query(&[("types", CHANNEL_TYPES), ("team_id", team_id)]),
            )
            .await?;
        check_ok(list.ok, list.error, "conversations.list")?;

        Ok(list
            .channels
            .into_iter()
            .find(|c| c.name.as_deref() == Some(name)))
    }

    /// Post a plain-text message to a channel.
    pub async fn post_message(
        &self,
        access_token: &str,
        channel: &str,
        text: &str,
    ) -> Result<PostMessageResponse, SlackError> {
        let result: PostMessageResponse = self
            .send(
                self.client
                    .post(self.url("chat.postMessage"))
                    .bearer_auth(access_token)
                    .json(&PostMessageRequest { channel, text }),
            )
            .await?;

        if !result.ok {
            error!(error = ?result.error, channel = %channel, "slack_post_message_failed");
            return Err(SlackError::Api(
                result.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        debug!(ts = ?result.ts, channel = ?result.channel, "slack_message_posted");
        Ok(result)
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, SlackError> {
        let response = request
            .send()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))?;

        response
            .json()
            .await
            .map_err(|e| SlackError::Response(e.to_string()))
    }
}

fn check_ok(ok: bool, error: Option<String>, method: &str) -> Result<(), SlackError> {
    if ok {
        return Ok(());
    }
    error!(method = method, error = ?error, "slack_api_error");
    Err(SlackError::Api(
        error.unwrap_or_else(|| "Unknown error".to_string()),
    ))
}

/// Extract the workspace subdomain from `https://<team>.slack.com/...`.
fn team_from_url(url: &str) -> Option<String> {
    let host = url.strip_prefix("https://")?.split('/').next()?;
    let team = host.strip_suffix(".slack.com")?;
    if team.is_empty() {
        return None;
    }
    Some(team.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Query,
        http::HeaderMap,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn oauth_access(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
        if q.get("code").map(String::as_str) != Some("good-code")
            || q.get("client_secret").map(String::as_str) != Some("secret")
        {
            return Json(json!({ "ok": false, "error": "invalid_code" }));
        }
        Json(json!({
            "ok": true,
            "access_token": "xoxb-bot",
            "authed_user": { "id": "U123", "access_token": "xoxp-user" }
        }))
    }

    async fn auth_test(headers: HeaderMap) -> Json<Value> {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if auth != "Bearer xoxp-user" {
            return Json(json!({ "ok": false, "error": "invalid_auth" }));
        }
        Json(json!({ "ok": true, "url": "https://acme.slack.com/", "team_id": "T999" }))
    }

    async fn conversations_list(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
        assert_eq!(q.get("types").map(String::as_str), Some(CHANNEL_TYPES));
        Json(json!({
            "ok": true,
            "channels": [
                { "id": "D1" },
                { "id": "C1", "name": "general" },
                { "id": "C2", "name": "alerts" }
            ]
        }))
    }

    async fn post_message(Json(body): Json<Value>) -> Json<Value> {
        if body["channel"] == "C404" {
            return Json(json!({ "ok": false, "error": "channel_not_found" }));
        }
        Json(json!({ "ok": true, "ts": "1.0", "channel": body["channel"] }))
    }

    async fn spawn_stub() -> String {
        let app = Router::new()
            .route("/oauth.v2.access", get(oauth_access))
            .route("/auth.test", get(auth_test))
            .route("/conversations.list", get(conversations_list))
            .route("/chat.postMessage", post(post_message));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base: String) -> SlackClient {
        SlackClient::new(base, "client-id", "secret", None, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_team_from_url() {
        assert_eq!(team_from_url("https://acme.slack.com/"), Some("acme".to_string()));
        assert_eq!(team_from_url("https://acme.slack.com"), Some("acme".to_string()));
        assert_eq!(team_from_url("http://acme.slack.com/"), None);
        assert_eq!(team_from_url("https://example.com/"), None);
        assert_eq!(team_from_url("https://.slack.com/"), None);
    }

    #[tokio::test]
    async fn test_exchange_code() {
        let slack = client(spawn_stub().await);

        let team = slack.exchange_code("good-code").await.unwrap();

        assert_eq!(team.user_id, "U123");
        assert_eq!(team.team, "acme");
        assert_eq!(team.team_id, "T999");
        assert_eq!(team.access_token, "xoxb-bot");
    }

    #[tokio::test]
    async fn test_exchange_code_rejected() {
        let slack = client(spawn_stub().await);

        let err = slack.exchange_code("bad-code").await.unwrap_err();
        assert!(matches!(err, SlackError::Api(ref e) if e == "invalid_code"));
    }

    #[tokio::test]
    async fn test_find_channel() {
        let slack = client(spawn_stub().await);

        let found = slack.find_channel("xoxb-bot", "T999", "alerts").await.unwrap();
        assert_eq!(found.map(|c| c.id), Some("C2".to_string()));

        let missing = slack.find_channel("xoxb-bot", "T999", "random").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_post_message() {
        let slack = client(spawn_stub().await);

        let sent = slack.post_message("xoxb-bot", "C1", "hello").await.unwrap();
        assert_eq!(sent.channel.as_deref(), Some("C1"));

        let err = slack.post_message("xoxb-bot", "C404", "hello").await.unwrap_err();
        assert!(matches!(err, SlackError::Api(ref e) if e == "channel_not_found"));
    }

    #[tokio::test]
    async fn test_unreachable_api() {
        let slack = client("http://127.0.0.1:1".to_string());
        assert!(matches!(
            slack.exchange_code("good-code").await,
            Err(SlackError::Request(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let slack = client("http://localhost".to_string());
        let printed = format!("{slack:?}");
        assert!(!printed.contains("\"secret\""));
        assert!(printed.contains("[REDACTED]"));
    }
}
