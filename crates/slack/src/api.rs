//! The outbound Slack collaborator, as a trait so extensions and tests never
//! touch the network directly.

use {
    async_trait::async_trait,
    watchword_common::types::{ChannelInfo, UserProfile},
};

use crate::error::Result;

/// Everything watchword asks of the Slack Web API.
///
/// Implementations must be safe to share across tasks; the production
/// implementation is [`crate::web::WebGateway`].
#[async_trait]
pub trait SlackGateway: Send + Sync {
    /// Identify the bot's own user id.
    async fn auth_test(&self) -> Result<String>;

    /// Post a regular message, optionally inside a thread.
    async fn post_message(&self, channel: &str, thread_ts: Option<&str>, text: &str)
    -> Result<()>;

    /// Post an ephemeral message visible only to `user`.
    async fn post_ephemeral(&self, channel: &str, user: &str, text: &str) -> Result<()>;

    /// Open (or reuse) a direct conversation with `user`, returning its
    /// channel id.
    async fn open_im(&self, user: &str) -> Result<String>;

    /// List all channels the bot can see.
    async fn list_channels(&self) -> Result<Vec<ChannelInfo>>;

    /// Look up a user. `Ok(None)` means the id does not exist; `Err` means
    /// the lookup itself failed and must not be cached.
    async fn user_info(&self, user: &str) -> Result<Option<UserProfile>>;
}
