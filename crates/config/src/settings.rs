use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    std::path::PathBuf,
};

use crate::error::{Context as _, Error, Result};

/// Runtime settings for the bot process.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    /// Bot token (`xoxb-…`) used for every Web API call.
    #[serde(serialize_with = "serialize_secret")]
    pub bot_token: Secret<String>,

    /// Display name stamped on outgoing messages.
    pub username: String,

    /// Icon emoji stamped on outgoing messages.
    pub icon_emoji: String,

    /// Address the inbound events listener binds to.
    pub bind: String,

    /// Port for the inbound events listener.
    pub port: u16,

    /// Path of the events endpoint the workspace is configured to post to.
    pub api_endpoint: String,

    /// Directory holding per-extension persisted state.
    pub state_dir: PathBuf,
}

impl BotSettings {
    /// Build settings from the environment. `WATCHWORD_BOT_TOKEN` is
    /// required; everything else falls back to defaults.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("WATCHWORD_BOT_TOKEN").context("WATCHWORD_BOT_TOKEN is not set")?;
        if token.trim().is_empty() {
            return Err(Error::message("WATCHWORD_BOT_TOKEN is empty"));
        }
        let mut settings = Self {
            bot_token: Secret::new(token),
            ..Self::default()
        };
        if let Ok(dir) = std::env::var("WATCHWORD_STATE_DIR") {
            settings.state_dir = PathBuf::from(dir);
        }
        Ok(settings)
    }

    #[must_use]
    pub fn token(&self) -> Secret<String> {
        Secret::new(self.bot_token.expose_secret().clone())
    }
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            bot_token: Secret::new(String::new()),
            username: "watchword".into(),
            icon_emoji: ":robot_face:".into(),
            bind: "0.0.0.0".into(),
            port: 3000,
            api_endpoint: "/slack/events".into(),
            state_dir: PathBuf::from("state"),
        }
    }
}

impl std::fmt::Debug for BotSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotSettings")
            .field("bot_token", &"[REDACTED]")
            .field("username", &self.username)
            .field("bind", &self.bind)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
