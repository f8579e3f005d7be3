//! Reply assembly and delivery: mode fan-out and send-time channel-mention
//! resolution.

use {
    std::sync::Arc,
    tracing::{debug, warn},
    watchword_common::types::MessageEvent,
    watchword_slack::{Directory, SlackGateway},
};

/// Placeholder substituted with the rendered channel mentions.
pub const CHANNELS_PLACEHOLDER: &str = "{channels}";

/// One way a reply reaches the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Plain message in the originating conversation.
    Regular,
    /// Visible only to the triggering user.
    Ephemeral,
    /// Public message inside the triggering message's thread.
    Thread,
}

/// What a reply says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyBody {
    /// Verbatim text.
    Text(String),
    /// A template whose `{channels}` placeholder is filled with canonical
    /// mentions, resolved immediately before the send.
    ChannelList {
        template: String,
        channels: Vec<String>,
    },
}

/// A reply plus the modes it goes out through. An empty mode set delivers
/// nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub body: ReplyBody,
    pub modes: Vec<DeliveryMode>,
}

impl Reply {
    #[must_use]
    pub fn regular(text: impl Into<String>) -> Self {
        Self {
            body: ReplyBody::Text(text.into()),
            modes: vec![DeliveryMode::Regular],
        }
    }
}

/// Sends replies through the gateway, resolving channel references against
/// the directory at the last moment so renamed or recreated channels come
/// out right.
#[derive(Clone)]
pub struct ReplyDelivery {
    gateway: Arc<dyn SlackGateway>,
    directory: Arc<Directory>,
}

impl ReplyDelivery {
    #[must_use]
    pub fn new(gateway: Arc<dyn SlackGateway>, directory: Arc<Directory>) -> Self {
        Self { gateway, directory }
    }

    /// Deliver `reply` in response to `event`, once per mode.
    pub async fn send(&self, event: &MessageEvent, reply: &Reply) -> watchword_slack::Result<()> {
        let text = self.render(&reply.body).await?;
        for mode in &reply.modes {
            match mode {
                DeliveryMode::Regular => {
                    self.gateway
                        .post_message(&event.channel, None, &text)
                        .await?;
                }
                DeliveryMode::Thread => {
                    self.gateway
                        .post_message(&event.channel, Some(event.thread_root()), &text)
                        .await?;
                }
                DeliveryMode::Ephemeral => {
                    self.gateway
                        .post_ephemeral(&event.channel, &event.user, &text)
                        .await?;
                }
            }
            debug!(channel = %event.channel, ?mode, "reply delivered");
        }
        Ok(())
    }

    async fn render(&self, body: &ReplyBody) -> watchword_slack::Result<String> {
        match body {
            ReplyBody::Text(text) => Ok(text.clone()),
            ReplyBody::ChannelList { template, channels } => {
                let mut mentions = Vec::with_capacity(channels.len());
                for reference in channels {
                    mentions.push(self.mention_for(reference).await?);
                }
                Ok(template.replace(CHANNELS_PLACEHOLDER, &mentions.join(" ")))
            }
        }
    }

    /// Already-tagged mentions pass through untouched; everything else is
    /// resolved by name. An unresolvable name degrades to literal `#name`
    /// rather than failing the whole reply.
    async fn mention_for(&self, reference: &str) -> watchword_slack::Result<String> {
        if reference.starts_with("<#") {
            return Ok(reference.to_owned());
        }
        match self.directory.resolve_channel(reference).await? {
            Some(info) => Ok(info.mention()),
            None => {
                warn!(channel = reference, "unresolvable channel in reply, sending as text");
                let bare = reference.strip_prefix('#').unwrap_or(reference);
                Ok(format!("#{bare}"))
            }
        }
    }
}
