//! Event and profile types shared between the gateway, directory, and
//! extension crates.

use serde::{Deserialize, Serialize};

/// The kind of conversation an event originated from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// A shared (public or private) channel.
    #[default]
    Channel,
    /// A direct, one-to-one conversation.
    Im,
    /// A multi-party direct conversation.
    Mpim,
    /// A legacy private group.
    Group,
    /// Anything the platform adds later.
    #[serde(other)]
    Other,
}

impl ChannelKind {
    /// True for direct conversations (where configuration commands are
    /// accepted).
    #[must_use]
    pub fn is_im(self) -> bool {
        matches!(self, Self::Im)
    }

    /// True for shared channels (where configuration commands are redirected).
    #[must_use]
    pub fn is_shared(self) -> bool {
        matches!(self, Self::Channel | Self::Group | Self::Mpim)
    }
}

/// A single inbound "message" event.
///
/// Field names follow the platform payload so the envelope deserializes
/// straight from the events API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub channel_type: ChannelKind,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
}

impl MessageEvent {
    /// True when this message is a child inside an existing thread (as
    /// opposed to a thread parent or a top-level message).
    #[must_use]
    pub fn is_thread_child(&self) -> bool {
        self.thread_ts.as_deref().is_some_and(|root| root != self.ts)
    }

    /// Timestamp of the thread this message belongs to — the parent's `ts`
    /// for thread children, the message's own `ts` otherwise.
    #[must_use]
    pub fn thread_root(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }
}

/// An inbound event together with the delivery time reported by the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(default)]
    pub event_time: f64,
    pub event: MessageEvent,
}

/// Cached user snapshot — just the fields the authorization gate needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_owner: bool,
}

impl UserProfile {
    /// The authorization predicate for configuration commands.
    #[must_use]
    pub fn is_admin_or_owner(&self) -> bool {
        self.is_admin || self.is_owner
    }
}

/// Cached channel snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl ChannelInfo {
    /// Canonical mention token, e.g. `<#C024BE7LR|general>`.
    #[must_use]
    pub fn mention(&self) -> String {
        if self.name.is_empty() {
            format!("<#{}>", self.id)
        } else {
            format!("<#{}|{}>", self.id, self.name)
        }
    }
}
