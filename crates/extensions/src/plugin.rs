//! The extension capability trait and the host handle extensions are built
//! against.

use {
    async_trait::async_trait,
    std::{future::Future, pin::Pin, sync::Arc},
    watchword_common::types::MessageEvent,
    watchword_config::StateStore,
    watchword_slack::{Directory, SlackGateway},
};

/// A pluggable behavior unit. Extensions see every message the dispatcher
/// lets through for them and decide on their own what to do with it.
///
/// Methods take `&self`; extensions that mutate state use interior
/// mutability so a single instance can be shared with the registry.
#[async_trait]
pub trait Extension: Send + Sync {
    /// Stable name, the registry key (compared case-insensitively).
    fn name(&self) -> &str;

    /// A plain text message arrived in a conversation this extension is
    /// enabled for.
    async fn on_message(&self, event: &MessageEvent) -> anyhow::Result<()>;

    /// A message was deleted. Default: ignore.
    async fn on_message_deletion(&self, _event: &MessageEvent) -> anyhow::Result<()> {
        Ok(())
    }

    /// A message was edited. Default: ignore.
    async fn on_message_changed(&self, _event: &MessageEvent) -> anyhow::Result<()> {
        Ok(())
    }

    /// Human-readable usage summary, shown by `extension help <name>`.
    fn help(&self) -> String;
}

/// Shared collaborators handed to extension factories at load time.
#[derive(Clone)]
pub struct ExtensionHost {
    pub gateway: Arc<dyn SlackGateway>,
    pub directory: Arc<Directory>,
    pub store: Arc<dyn StateStore>,
}

/// Async constructor for an extension instance, bound into the registry at
/// registration and run at load time.
pub type ExtensionFactory = Arc<
    dyn Fn(ExtensionHost) -> Pin<Box<dyn Future<Output = anyhow::Result<Arc<dyn Extension>>> + Send>>
        + Send
        + Sync,
>;
