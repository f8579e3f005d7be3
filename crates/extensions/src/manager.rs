//! The extension-manager extension: admin lifecycle control over every
//! registered extension, driven by the `extension` control token.

use {
    async_trait::async_trait,
    std::sync::Arc,
    tokio::sync::Mutex,
    tracing::warn,
    watchword_common::types::MessageEvent,
};

use crate::{
    delivery::{Reply, ReplyDelivery},
    error::Error,
    plugin::{Extension, ExtensionFactory, ExtensionHost},
    registry::ExtensionRegistry,
    router::{self, RouteOutcome},
};

pub const NAME: &str = "manager";
pub const CONTROL_TOKEN: &str = "extension";

const DID_NOT_UNDERSTAND: &str = "I didn't understand your request, could you retry?";
const UNKNOWN_EXTENSION: &str = "I don't know that extension...";
const UNKNOWN_CHANNEL: &str = "I couldn't find that channel...";
const HELP: &str = "Extension manager help (admin only!):\n\
    \n\
    - Type *extension list* for every extension and its state\n\
    - Type *extension load* _name_ to instantiate an extension\n\
    - Type *extension enable* _name_ / *extension disable* _name_ to flip the global gate\n\
    - Type *extension enable_for* _name_ #channel / *extension disable_for* _name_ #channel to scope it to a channel\n\
    - Type *extension enable_for_im* _name_ / *extension disable_for_im* _name_ for direct messages\n\
    - Type *extension help* _name_ for one extension's own help\n\
    \n\
    *Attention!* Actions are performed without confirmation";

/// Manages the registry it itself lives in. Registry mutations last for the
/// process; nothing here is persisted.
pub struct ExtensionManager {
    registry: Arc<Mutex<ExtensionRegistry>>,
    host: ExtensionHost,
    delivery: ReplyDelivery,
}

impl ExtensionManager {
    #[must_use]
    pub fn new(registry: Arc<Mutex<ExtensionRegistry>>, host: ExtensionHost) -> Self {
        let delivery = ReplyDelivery::new(host.gateway.clone(), host.directory.clone());
        Self {
            registry,
            host,
            delivery,
        }
    }

    /// Factory for registering the manager alongside ordinary extensions.
    #[must_use]
    pub fn factory(registry: Arc<Mutex<ExtensionRegistry>>) -> ExtensionFactory {
        Arc::new(move |host| {
            let registry = registry.clone();
            Box::pin(async move {
                Ok(Arc::new(ExtensionManager::new(registry, host)) as Arc<dyn Extension>)
            })
        })
    }

    /// Run one command. Subcommands and names are matched on sanitized
    /// tokens; the channel argument comes from the raw token at the same
    /// position so mention tokens survive intact.
    async fn handle_command(&self, event: &MessageEvent) -> Option<Reply> {
        let (tokens, raw) = router::token_pairs(&event.text);
        if tokens.first().map(String::as_str) != Some(CONTROL_TOKEN) {
            return Some(Reply::regular(HELP));
        }
        let name = tokens.get(2).map(String::as_str);

        match tokens.get(1).map(String::as_str) {
            None | Some("list") => Some(Reply::regular(self.list().await)),
            Some("help") => Some(Reply::regular(self.help_for(name).await)),
            Some("load") => Some(self.load(name).await),
            Some("enable") => Some(self.set_enabled(name, true).await),
            Some("disable") => Some(self.set_enabled(name, false).await),
            Some("enable_for") => {
                self.set_channel_scope(name, raw.get(3).copied(), true).await
            }
            Some("disable_for") => {
                self.set_channel_scope(name, raw.get(3).copied(), false).await
            }
            Some("enable_for_im") => Some(self.set_im_scope(name, true).await),
            Some("disable_for_im") => Some(self.set_im_scope(name, false).await),
            Some(_) => Some(Reply::regular(HELP)),
        }
    }

    async fn list(&self) -> String {
        let registry = self.registry.lock().await;
        let mut lines = vec!["Here is every extension I know about:".to_owned()];
        for line in registry.describe() {
            lines.push(format!("- {line}"));
        }
        lines.join("\n")
    }

    async fn help_for(&self, name: Option<&str>) -> String {
        let Some(name) = name else {
            return HELP.to_owned();
        };
        let registry = self.registry.lock().await;
        match registry.instance(name) {
            Some(instance) => instance.help(),
            None => UNKNOWN_EXTENSION.to_owned(),
        }
    }

    async fn load(&self, name: Option<&str>) -> Reply {
        let Some(name) = name else {
            return Reply::regular(DID_NOT_UNDERSTAND);
        };
        let mut registry = self.registry.lock().await;
        match registry.load(name, &self.host).await {
            Ok(()) => Reply::regular(format!("Thanks! Extension {name} is loaded now")),
            Err(Error::NotRegistered(_)) => Reply::regular(UNKNOWN_EXTENSION),
            Err(err) => {
                warn!(extension = name, %err, "extension load failed");
                Reply::regular(format!("I couldn't load {name}, sorry!"))
            }
        }
    }

    async fn set_enabled(&self, name: Option<&str>, enabled: bool) -> Reply {
        let Some(name) = name else {
            return Reply::regular(DID_NOT_UNDERSTAND);
        };
        let mut registry = self.registry.lock().await;
        let result = if enabled {
            registry.enable(name)
        } else {
            registry.disable(name)
        };
        match result {
            Ok(()) => {
                let verb = if enabled { "enabled" } else { "disabled" };
                Reply::regular(format!("Thanks! Extension {name} is {verb} now"))
            }
            Err(Error::NotRegistered(_)) => Reply::regular(UNKNOWN_EXTENSION),
            Err(Error::NotLoaded(_)) => {
                Reply::regular(format!("Extension {name} must be loaded first"))
            }
            Err(Error::NotEnabled(_)) => {
                Reply::regular(format!("Extension {name} is not enabled"))
            }
            Err(err) => {
                warn!(extension = name, %err, "lifecycle command failed");
                Reply::regular(DID_NOT_UNDERSTAND)
            }
        }
    }

    /// `enable_for` / `disable_for`. The channel argument resolves through
    /// the directory so the allow-set always holds channel ids. `None` means
    /// the command aborted on an upstream failure, with no reply.
    async fn set_channel_scope(
        &self,
        name: Option<&str>,
        channel: Option<&str>,
        enabled: bool,
    ) -> Option<Reply> {
        let (Some(name), Some(channel)) = (name, channel) else {
            return Some(Reply::regular(DID_NOT_UNDERSTAND));
        };
        let resolved = match self.host.directory.resolve_channel(channel).await {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(channel, %err, "channel resolution failed, aborting command");
                return None;
            }
        };
        let Some(info) = resolved else {
            return Some(Reply::regular(UNKNOWN_CHANNEL));
        };

        let mut registry = self.registry.lock().await;
        let result = if enabled {
            registry.enable_for(name, &info.id)
        } else {
            registry.disable_for(name, &info.id)
        };
        Some(match result {
            Ok(()) => {
                let verb = if enabled { "active in" } else { "inactive in" };
                Reply::regular(format!("Thanks! Extension {name} is {verb} {}", info.mention()))
            }
            Err(_) => Reply::regular(UNKNOWN_EXTENSION),
        })
    }

    async fn set_im_scope(&self, name: Option<&str>, enabled: bool) -> Reply {
        let Some(name) = name else {
            return Reply::regular(DID_NOT_UNDERSTAND);
        };
        let mut registry = self.registry.lock().await;
        let result = if enabled {
            registry.enable_for_im(name)
        } else {
            registry.disable_for_im(name)
        };
        match result {
            Ok(()) => {
                let state = if enabled { "active" } else { "inactive" };
                Reply::regular(format!("Thanks! Extension {name} is {state} in direct messages"))
            }
            Err(_) => Reply::regular(UNKNOWN_EXTENSION),
        }
    }
}

#[async_trait]
impl Extension for ExtensionManager {
    fn name(&self) -> &str {
        NAME
    }

    async fn on_message(&self, event: &MessageEvent) -> anyhow::Result<()> {
        let sanitized = router::sanitize(&event.text);
        if !router::has_control_token(&sanitized, CONTROL_TOKEN) {
            return Ok(());
        }

        let outcome = match router::route_command(event, &self.host.directory, self.host.gateway.as_ref())
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(%err, "command routing failed, aborting");
                return Ok(());
            }
        };
        if outcome != RouteOutcome::Command {
            return Ok(());
        }

        if let Some(reply) = self.handle_command(event).await {
            if let Err(err) = self.delivery.send(event, &reply).await {
                warn!(%err, "could not deliver manager reply");
            }
        }
        Ok(())
    }

    fn help(&self) -> String {
        HELP.to_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::registry::ExtensionRegistry,
        std::sync::Mutex as StdMutex,
        watchword_common::{
            SystemClock,
            types::{ChannelInfo, ChannelKind, UserProfile},
        },
        watchword_config::JsonFileStore,
        watchword_slack::Directory,
    };

    struct StubGateway {
        sent: StdMutex<Vec<(String, String)>>,
        admin: bool,
    }

    impl StubGateway {
        fn new(admin: bool) -> Self {
            Self {
                sent: StdMutex::new(Vec::new()),
                admin,
            }
        }
    }

    #[async_trait]
    impl watchword_slack::SlackGateway for StubGateway {
        async fn auth_test(&self) -> watchword_slack::Result<String> {
            Ok("UBOT".into())
        }

        async fn post_message(
            &self,
            channel: &str,
            _: Option<&str>,
            text: &str,
        ) -> watchword_slack::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((channel.to_owned(), text.to_owned()));
            Ok(())
        }

        async fn post_ephemeral(&self, _: &str, _: &str, _: &str) -> watchword_slack::Result<()> {
            Ok(())
        }

        async fn open_im(&self, _: &str) -> watchword_slack::Result<String> {
            Ok("DIM".into())
        }

        async fn list_channels(&self) -> watchword_slack::Result<Vec<ChannelInfo>> {
            Ok(vec![ChannelInfo {
                id: "C1".into(),
                name: "general".into(),
            }])
        }

        async fn user_info(&self, user: &str) -> watchword_slack::Result<Option<UserProfile>> {
            Ok(Some(UserProfile {
                id: user.into(),
                name: "someone".into(),
                is_admin: self.admin,
                is_owner: false,
            }))
        }
    }

    struct Dummy;

    #[async_trait]
    impl Extension for Dummy {
        fn name(&self) -> &str {
            "dummy"
        }
        async fn on_message(&self, _: &MessageEvent) -> anyhow::Result<()> {
            Ok(())
        }
        fn help(&self) -> String {
            "dummy help text".into()
        }
    }

    fn dummy_factory() -> ExtensionFactory {
        Arc::new(|_host| Box::pin(async { Ok(Arc::new(Dummy) as Arc<dyn Extension>) }))
    }

    async fn setup(admin: bool) -> (ExtensionManager, Arc<StubGateway>, Arc<Mutex<ExtensionRegistry>>) {
        let gateway = Arc::new(StubGateway::new(admin));
        let host = ExtensionHost {
            gateway: gateway.clone(),
            directory: Arc::new(Directory::new(gateway.clone(), Arc::new(SystemClock))),
            store: Arc::new(JsonFileStore::new(std::env::temp_dir())),
        };
        let mut registry = ExtensionRegistry::new();
        registry.register("dummy", dummy_factory());
        let registry = Arc::new(Mutex::new(registry));
        (ExtensionManager::new(registry.clone(), host), gateway, registry)
    }

    fn im_event(text: &str) -> MessageEvent {
        MessageEvent {
            channel: "DIM".into(),
            channel_type: ChannelKind::Im,
            user: "U1".into(),
            text: text.into(),
            ts: "1.0".into(),
            ..Default::default()
        }
    }

    fn sent(gateway: &StubGateway) -> Vec<(String, String)> {
        gateway.sent.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn lifecycle_over_commands() {
        let (manager, gateway, registry) = setup(true).await;

        manager.on_message(&im_event("extension load dummy")).await.unwrap();
        manager.on_message(&im_event("extension enable dummy")).await.unwrap();
        manager
            .on_message(&im_event("extension enable_for_im dummy"))
            .await
            .unwrap();

        let event = im_event("anything");
        assert!(registry.lock().await.is_enabled_for("dummy", &event));
        let replies = sent(&gateway);
        assert_eq!(replies.len(), 3);
        assert!(replies[0].1.contains("loaded"));
    }

    #[tokio::test]
    async fn enable_before_load_is_rejected() {
        let (manager, gateway, _) = setup(true).await;
        manager.on_message(&im_event("extension enable dummy")).await.unwrap();
        assert!(sent(&gateway)[0].1.contains("must be loaded first"));
    }

    #[tokio::test]
    async fn enable_for_resolves_channel_to_id() {
        let (manager, gateway, registry) = setup(true).await;
        manager.on_message(&im_event("extension load dummy")).await.unwrap();
        manager.on_message(&im_event("extension enable dummy")).await.unwrap();
        manager
            .on_message(&im_event("extension enable_for dummy #general"))
            .await
            .unwrap();

        let event = MessageEvent {
            channel: "C1".into(),
            channel_type: ChannelKind::Channel,
            ..Default::default()
        };
        assert!(registry.lock().await.is_enabled_for("dummy", &event));
        assert!(sent(&gateway).last().unwrap().1.contains("<#C1|general>"));
    }

    #[tokio::test]
    async fn unknown_extension_gets_fixed_reply() {
        let (manager, gateway, _) = setup(true).await;
        manager.on_message(&im_event("extension load ghost")).await.unwrap();
        assert_eq!(sent(&gateway)[0].1, UNKNOWN_EXTENSION);
    }

    #[tokio::test]
    async fn missing_argument_gets_didnt_understand() {
        let (manager, gateway, _) = setup(true).await;
        manager.on_message(&im_event("extension load")).await.unwrap();
        assert_eq!(sent(&gateway)[0].1, DID_NOT_UNDERSTAND);
    }

    #[tokio::test]
    async fn non_admin_is_fully_silent() {
        let (manager, gateway, registry) = setup(false).await;
        manager.on_message(&im_event("extension load dummy")).await.unwrap();
        assert!(sent(&gateway).is_empty());
        assert!(registry.lock().await.instance("dummy").is_none());
    }

    #[tokio::test]
    async fn public_channel_command_redirects_without_running() {
        let (manager, gateway, registry) = setup(true).await;
        let mut event = im_event("extension load dummy");
        event.channel = "C1".into();
        event.channel_type = ChannelKind::Channel;
        manager.on_message(&event).await.unwrap();

        let replies = sent(&gateway);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].0, "DIM");
        assert_eq!(replies[0].1, router::PRIVACY_NOTICE);
        assert!(registry.lock().await.instance("dummy").is_none());
    }

    #[tokio::test]
    async fn help_for_extension_uses_its_own_text() {
        let (manager, gateway, _) = setup(true).await;
        manager.on_message(&im_event("extension load dummy")).await.unwrap();
        manager.on_message(&im_event("extension help dummy")).await.unwrap();
        assert_eq!(sent(&gateway)[1].1, "dummy help text");
    }

    #[tokio::test]
    async fn messages_without_control_token_pass_through() {
        let (manager, gateway, _) = setup(true).await;
        manager.on_message(&im_event("just chatting")).await.unwrap();
        assert!(sent(&gateway).is_empty());
    }
}
