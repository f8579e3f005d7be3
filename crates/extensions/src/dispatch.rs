//! The event dispatcher: filters inbound events and fans them out to the
//! enabled extensions, one event at a time.

use {
    std::sync::Arc,
    tokio::sync::{Mutex, mpsc},
    tracing::{debug, warn},
    watchword_common::types::{EventEnvelope, MessageEvent},
};

use crate::{plugin::Extension, registry::ExtensionRegistry};

enum Hook {
    Message,
    Deletion,
    Changed,
}

/// Consumes the inbound event stream. Events run strictly one after another,
/// so extensions never observe interleaved commands.
pub struct Dispatcher {
    registry: Arc<Mutex<ExtensionRegistry>>,
    bot_user_id: String,
    started_at: f64,
}

impl Dispatcher {
    #[must_use]
    pub fn new(registry: Arc<Mutex<ExtensionRegistry>>, bot_user_id: String, started_at: f64) -> Self {
        Self {
            registry,
            bot_user_id,
            started_at,
        }
    }

    /// Drain the receiver until all senders hang up.
    pub async fn run(&self, mut events: mpsc::Receiver<EventEnvelope>) {
        while let Some(envelope) = events.recv().await {
            self.handle(envelope).await;
        }
        debug!("event stream closed, dispatcher stopping");
    }

    /// Process one envelope. Extension failures are contained here; nothing
    /// propagates past the current event.
    pub async fn handle(&self, envelope: EventEnvelope) {
        let event = envelope.event;

        // Events replayed from before this process started are stale.
        if envelope.event_time < self.started_at {
            debug!(ts = %event.ts, "dropping event from before startup");
            return;
        }
        if event.user == self.bot_user_id {
            debug!(ts = %event.ts, "dropping own message");
            return;
        }

        let hook = match event.subtype.as_deref() {
            None => Hook::Message,
            Some("message_deleted") => Hook::Deletion,
            Some("message_changed") => Hook::Changed,
            Some(subtype) => {
                debug!(subtype, "dropping unhandled message subtype");
                return;
            }
        };

        // Collect handles under the lock, then run without it so extensions
        // can reach back into the registry.
        let targets: Vec<Arc<dyn Extension>> = {
            let registry = self.registry.lock().await;
            registry.enabled_instances(&event)
        };

        for extension in targets {
            let result = match hook {
                Hook::Message => extension.on_message(&event).await,
                Hook::Deletion => extension.on_message_deletion(&event).await,
                Hook::Changed => extension.on_message_changed(&event).await,
            };
            if let Err(err) = result {
                warn!(extension = extension.name(), %err, "extension failed on event");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::plugin::{ExtensionFactory, ExtensionHost},
        async_trait::async_trait,
        std::sync::atomic::{AtomicUsize, Ordering},
        watchword_common::{SystemClock, types::ChannelKind},
        watchword_config::JsonFileStore,
        watchword_slack::Directory,
    };

    #[derive(Default)]
    struct Counter {
        messages: AtomicUsize,
        deletions: AtomicUsize,
    }

    struct CountingExtension {
        counter: Arc<Counter>,
        fail: bool,
    }

    #[async_trait]
    impl Extension for CountingExtension {
        fn name(&self) -> &str {
            "counting"
        }

        async fn on_message(&self, _: &MessageEvent) -> anyhow::Result<()> {
            self.counter.messages.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("boom");
            }
            Ok(())
        }

        async fn on_message_deletion(&self, _: &MessageEvent) -> anyhow::Result<()> {
            self.counter.deletions.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn help(&self) -> String {
            "counting".into()
        }
    }

    struct NullGateway;

    #[async_trait]
    impl watchword_slack::SlackGateway for NullGateway {
        async fn auth_test(&self) -> watchword_slack::Result<String> {
            Ok("UBOT".into())
        }
        async fn post_message(
            &self,
            _: &str,
            _: Option<&str>,
            _: &str,
        ) -> watchword_slack::Result<()> {
            Ok(())
        }
        async fn post_ephemeral(&self, _: &str, _: &str, _: &str) -> watchword_slack::Result<()> {
            Ok(())
        }
        async fn open_im(&self, _: &str) -> watchword_slack::Result<String> {
            Ok("D1".into())
        }
        async fn list_channels(
            &self,
        ) -> watchword_slack::Result<Vec<watchword_common::types::ChannelInfo>> {
            Ok(Vec::new())
        }
        async fn user_info(
            &self,
            _: &str,
        ) -> watchword_slack::Result<Option<watchword_common::types::UserProfile>> {
            Ok(None)
        }
    }

    fn host() -> ExtensionHost {
        let gateway = Arc::new(NullGateway);
        ExtensionHost {
            gateway: gateway.clone(),
            directory: Arc::new(Directory::new(gateway, Arc::new(SystemClock))),
            store: Arc::new(JsonFileStore::new(std::env::temp_dir())),
        }
    }

    fn counting_factory(counter: Arc<Counter>, fail: bool) -> ExtensionFactory {
        Arc::new(move |_host| {
            let counter = counter.clone();
            Box::pin(async move {
                Ok(Arc::new(CountingExtension { counter, fail }) as Arc<dyn Extension>)
            })
        })
    }

    async fn dispatcher(counter: Arc<Counter>, fail: bool) -> Dispatcher {
        let mut registry = ExtensionRegistry::new();
        registry.register("counting", counting_factory(counter, fail));
        registry.load_all(&host()).await.unwrap();
        registry.enable_all().unwrap();
        Dispatcher::new(Arc::new(Mutex::new(registry)), "UBOT".into(), 100.0)
    }

    fn envelope(event_time: f64, user: &str, subtype: Option<&str>) -> EventEnvelope {
        EventEnvelope {
            event_time,
            event: MessageEvent {
                channel: "D1".into(),
                channel_type: ChannelKind::Im,
                user: user.into(),
                text: "hello".into(),
                ts: format!("{event_time}"),
                subtype: subtype.map(str::to_owned),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn pre_start_events_are_dropped() {
        let counter = Arc::new(Counter::default());
        let dispatcher = dispatcher(counter.clone(), false).await;
        dispatcher.handle(envelope(99.0, "U1", None)).await;
        assert_eq!(counter.messages.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn own_messages_are_dropped() {
        let counter = Arc::new(Counter::default());
        let dispatcher = dispatcher(counter.clone(), false).await;
        dispatcher.handle(envelope(101.0, "UBOT", None)).await;
        assert_eq!(counter.messages.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn plain_messages_fan_out() {
        let counter = Arc::new(Counter::default());
        let dispatcher = dispatcher(counter.clone(), false).await;
        dispatcher.handle(envelope(101.0, "U1", None)).await;
        assert_eq!(counter.messages.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deletion_subtype_routes_to_hook() {
        let counter = Arc::new(Counter::default());
        let dispatcher = dispatcher(counter.clone(), false).await;
        dispatcher
            .handle(envelope(101.0, "U1", Some("message_deleted")))
            .await;
        assert_eq!(counter.messages.load(Ordering::SeqCst), 0);
        assert_eq!(counter.deletions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_subtypes_are_dropped() {
        let counter = Arc::new(Counter::default());
        let dispatcher = dispatcher(counter.clone(), false).await;
        dispatcher
            .handle(envelope(101.0, "U1", Some("channel_join")))
            .await;
        assert_eq!(counter.messages.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn extension_failure_does_not_stop_dispatch() {
        let counter = Arc::new(Counter::default());
        let dispatcher = dispatcher(counter.clone(), true).await;
        dispatcher.handle(envelope(101.0, "U1", None)).await;
        dispatcher.handle(envelope(102.0, "U1", None)).await;
        assert_eq!(counter.messages.load(Ordering::SeqCst), 2);
    }
}
