//! Production [`SlackGateway`] backed by the Slack Web API over reqwest.

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde_json::{Value, json},
    tracing::debug,
    watchword_common::types::{ChannelInfo, UserProfile},
};

use crate::{
    api::SlackGateway,
    error::{Error, Result},
};

const API_BASE: &str = "https://slack.com/api";

/// Outbound Web API client. Messages are decorated with the configured bot
/// username and icon so the workspace shows a consistent identity.
pub struct WebGateway {
    http: reqwest::Client,
    token: Secret<String>,
    username: String,
    icon_emoji: String,
}

impl WebGateway {
    #[must_use]
    pub fn new(token: Secret<String>, username: String, icon_emoji: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
            username,
            icon_emoji,
        }
    }

    /// GET-style Web API call with query parameters.
    async fn get(&self, method: &str, params: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{API_BASE}/{method}");
        let response = self
            .http
            .get(&url)
            .bearer_auth(self.token.expose_secret())
            .query(params)
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response.json().await?;
        Self::check_ok(method, body)
    }

    /// POST-style Web API call with a JSON body.
    async fn post(&self, method: &str, body: Value) -> Result<Value> {
        let url = format!("{API_BASE}/{method}");
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.token.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response.json().await?;
        Self::check_ok(method, body)
    }

    /// Every Web API response carries an `ok` flag; failures put the code in
    /// `error`.
    fn check_ok(method: &str, body: Value) -> Result<Value> {
        if body.get("ok").and_then(Value::as_bool) == Some(true) {
            return Ok(body);
        }
        let code = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        Err(Error::api(method, code))
    }
}

fn str_field<'a>(body: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut node = body;
    for key in path {
        node = node.get(key)?;
    }
    node.as_str()
}

#[async_trait]
impl SlackGateway for WebGateway {
    async fn auth_test(&self) -> Result<String> {
        let body = self.post("auth.test", json!({})).await?;
        str_field(&body, &["user_id"])
            .map(str::to_owned)
            .ok_or_else(|| Error::message("auth.test response missing user_id"))
    }

    async fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<()> {
        let mut body = json!({
            "channel": channel,
            "text": text,
            "username": self.username,
            "icon_emoji": self.icon_emoji,
        });
        if let (Some(ts), Value::Object(map)) = (thread_ts, &mut body) {
            map.insert("thread_ts".into(), Value::String(ts.to_owned()));
        }
        debug!(channel, threaded = thread_ts.is_some(), "posting message");
        self.post("chat.postMessage", body).await?;
        Ok(())
    }

    async fn post_ephemeral(&self, channel: &str, user: &str, text: &str) -> Result<()> {
        debug!(channel, user, "posting ephemeral message");
        self.post(
            "chat.postEphemeral",
            json!({
                "channel": channel,
                "user": user,
                "text": text,
                "username": self.username,
                "icon_emoji": self.icon_emoji,
            }),
        )
        .await?;
        Ok(())
    }

    async fn open_im(&self, user: &str) -> Result<String> {
        let body = self
            .post("conversations.open", json!({ "users": user }))
            .await?;
        str_field(&body, &["channel", "id"])
            .map(str::to_owned)
            .ok_or_else(|| Error::message("conversations.open response missing channel id"))
    }

    async fn list_channels(&self) -> Result<Vec<ChannelInfo>> {
        // Cursor pagination; an empty next_cursor ends the walk.
        let mut channels = Vec::new();
        let mut cursor = String::new();
        loop {
            let mut params = vec![("limit", "200"), ("types", "public_channel,private_channel")];
            if !cursor.is_empty() {
                params.push(("cursor", &cursor));
            }
            let body = self.get("conversations.list", &params).await?;
            if let Some(page) = body.get("channels").and_then(Value::as_array) {
                for entry in page {
                    if let Some(id) = str_field(entry, &["id"]) {
                        channels.push(ChannelInfo {
                            id: id.to_owned(),
                            name: str_field(entry, &["name"]).unwrap_or_default().to_owned(),
                        });
                    }
                }
            }
            cursor = str_field(&body, &["response_metadata", "next_cursor"])
                .unwrap_or_default()
                .to_owned();
            if cursor.is_empty() {
                break;
            }
        }
        debug!(count = channels.len(), "listed channels");
        Ok(channels)
    }

    async fn user_info(&self, user: &str) -> Result<Option<UserProfile>> {
        let body = match self.get("users.info", &[("user", user)]).await {
            Ok(body) => body,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };
        let Some(record) = body.get("user") else {
            return Ok(None);
        };
        Ok(Some(UserProfile {
            id: str_field(record, &["id"]).unwrap_or(user).to_owned(),
            name: str_field(record, &["name"]).unwrap_or_default().to_owned(),
            is_admin: record.get("is_admin").and_then(Value::as_bool) == Some(true),
            is_owner: record.get("is_owner").and_then(Value::as_bool) == Some(true),
        }))
    }
}

impl std::fmt::Debug for WebGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebGateway")
            .field("token", &"***")
            .field("username", &self.username)
            .field("icon_emoji", &self.icon_emoji)
            .finish()
    }
}
