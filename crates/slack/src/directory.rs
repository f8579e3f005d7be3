//! Workspace directory: cached user and channel lookups with a single coarse
//! expiry watermark.

use {
    std::{
        collections::HashMap,
        sync::{Arc, Mutex, PoisonError},
        time::{Duration, SystemTime},
    },
    tracing::{debug, warn},
    watchword_common::{
        Clock,
        types::{ChannelInfo, UserProfile},
    },
};

use crate::{api::SlackGateway, error::Result};

/// How long cached identities stay fresh. The whole cache expires together.
pub const CACHE_TTL: Duration = Duration::from_secs(600);

#[derive(Default)]
struct CacheInner {
    users: HashMap<String, UserProfile>,
    channels: Vec<ChannelInfo>,
    last_refresh: Option<SystemTime>,
}

/// Identity and channel cache in front of a [`SlackGateway`].
///
/// Staleness is checked lazily on access: once the watermark ages past
/// [`CACHE_TTL`], users and channels are dropped together and the watermark
/// resets. Upstream failures are never cached.
pub struct Directory {
    gateway: Arc<dyn SlackGateway>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    inner: Mutex<CacheInner>,
}

impl Directory {
    #[must_use]
    pub fn new(gateway: Arc<dyn SlackGateway>, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(gateway, clock, CACHE_TTL)
    }

    #[must_use]
    pub fn with_ttl(gateway: Arc<dyn SlackGateway>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            gateway,
            clock,
            ttl,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop everything once the watermark is older than the TTL. Called with
    /// the lock held on every access.
    fn expire_if_stale(&self, inner: &mut CacheInner) {
        let now = self.clock.now();
        let stale = match inner.last_refresh {
            Some(mark) => now
                .duration_since(mark)
                .map(|age| age > self.ttl)
                .unwrap_or(false),
            None => false,
        };
        if stale {
            debug!("directory cache expired");
            inner.users.clear();
            inner.channels.clear();
            inner.last_refresh = None;
        }
    }

    fn touch(inner: &mut CacheInner, now: SystemTime) {
        if inner.last_refresh.is_none() {
            inner.last_refresh = Some(now);
        }
    }

    /// Look up a user, hitting the network at most once per cache miss.
    /// `Ok(None)` means the id does not exist in the workspace.
    pub async fn user(&self, id: &str) -> Result<Option<UserProfile>> {
        {
            let mut inner = self.lock();
            self.expire_if_stale(&mut inner);
            if let Some(profile) = inner.users.get(id) {
                return Ok(Some(profile.clone()));
            }
        }

        let fetched = self.gateway.user_info(id).await?;
        let Some(profile) = fetched else {
            warn!(user = id, "user lookup found no such user");
            return Ok(None);
        };

        let mut inner = self.lock();
        Self::touch(&mut inner, self.clock.now());
        inner.users.insert(id.to_owned(), profile.clone());
        Ok(Some(profile))
    }

    /// Whether `id` may run configuration commands. Unknown users are not
    /// admins.
    pub async fn is_admin_or_owner(&self, id: &str) -> Result<bool> {
        Ok(self
            .user(id)
            .await?
            .is_some_and(|profile| profile.is_admin_or_owner()))
    }

    /// Resolve a channel reference: a `<#C123|name>` mention token, a raw id,
    /// `#name`, or a bare name. A name or id miss triggers exactly one full
    /// channel re-list before giving up.
    pub async fn resolve_channel(&self, token: &str) -> Result<Option<ChannelInfo>> {
        if let Some(parsed) = parse_mention(token) {
            return Ok(Some(parsed));
        }
        let needle = token.strip_prefix('#').unwrap_or(token);
        if needle.is_empty() {
            return Ok(None);
        }

        {
            let mut inner = self.lock();
            self.expire_if_stale(&mut inner);
            if let Some(found) = find_channel(&inner.channels, needle) {
                return Ok(Some(found));
            }
        }

        // Names cannot be point-queried, so a miss refreshes the whole list.
        let listed = self.gateway.list_channels().await?;
        let mut inner = self.lock();
        Self::touch(&mut inner, self.clock.now());
        inner.channels = listed;
        let resolved = find_channel(&inner.channels, needle);
        if resolved.is_none() {
            warn!(channel = token, "channel reference did not resolve");
        }
        Ok(resolved)
    }
}

/// Parse a `<#C024BE7LR|general>` or `<#C024BE7LR>` mention token.
fn parse_mention(token: &str) -> Option<ChannelInfo> {
    let body = token.strip_prefix("<#")?.strip_suffix('>')?;
    let (id, name) = match body.split_once('|') {
        Some((id, name)) => (id, name),
        None => (body, ""),
    };
    if id.is_empty() {
        return None;
    }
    Some(ChannelInfo {
        id: id.to_owned(),
        name: name.to_owned(),
    })
}

fn find_channel(channels: &[ChannelInfo], needle: &str) -> Option<ChannelInfo> {
    channels
        .iter()
        .find(|info| info.id == needle || info.name.eq_ignore_ascii_case(needle))
        .cloned()
}

impl std::fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory").field("ttl", &self.ttl).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        std::sync::atomic::{AtomicUsize, Ordering},
    };

    struct ManualClock {
        now: Mutex<SystemTime>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: Mutex::new(SystemTime::UNIX_EPOCH),
            }
        }

        fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> SystemTime {
            *self.now.lock().unwrap()
        }
    }

    #[derive(Default)]
    struct CountingGateway {
        user_calls: AtomicUsize,
        list_calls: AtomicUsize,
        users: HashMap<String, UserProfile>,
        channels: Vec<ChannelInfo>,
    }

    #[async_trait]
    impl SlackGateway for CountingGateway {
        async fn auth_test(&self) -> Result<String> {
            Ok("UBOT".into())
        }

        async fn post_message(&self, _: &str, _: Option<&str>, _: &str) -> Result<()> {
            Ok(())
        }

        async fn post_ephemeral(&self, _: &str, _: &str, _: &str) -> Result<()> {
            Ok(())
        }

        async fn open_im(&self, _: &str) -> Result<String> {
            Ok("D1".into())
        }

        async fn list_channels(&self) -> Result<Vec<ChannelInfo>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.channels.clone())
        }

        async fn user_info(&self, user: &str) -> Result<Option<UserProfile>> {
            self.user_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.users.get(user).cloned())
        }
    }

    fn admin(id: &str) -> UserProfile {
        UserProfile {
            id: id.into(),
            name: "alice".into(),
            is_admin: true,
            is_owner: false,
        }
    }

    fn directory(gateway: CountingGateway, clock: Arc<ManualClock>) -> (Directory, Arc<CountingGateway>) {
        let gateway = Arc::new(gateway);
        let directory = Directory::with_ttl(gateway.clone(), clock, Duration::from_secs(600));
        (directory, gateway)
    }

    #[tokio::test]
    async fn second_lookup_within_ttl_hits_cache() {
        let clock = Arc::new(ManualClock::new());
        let mut gateway = CountingGateway::default();
        gateway.users.insert("U1".into(), admin("U1"));
        let (directory, gateway) = directory(gateway, clock);

        assert!(directory.is_admin_or_owner("U1").await.unwrap());
        assert!(directory.is_admin_or_owner("U1").await.unwrap());
        assert_eq!(gateway.user_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lookup_after_ttl_refetches() {
        let clock = Arc::new(ManualClock::new());
        let mut gateway = CountingGateway::default();
        gateway.users.insert("U1".into(), admin("U1"));
        let (directory, gateway) = directory(gateway, clock.clone());

        assert!(directory.is_admin_or_owner("U1").await.unwrap());
        clock.advance(Duration::from_secs(601));
        assert!(directory.is_admin_or_owner("U1").await.unwrap());
        assert_eq!(gateway.user_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expiry_clears_channels_with_users() {
        let clock = Arc::new(ManualClock::new());
        let mut gateway = CountingGateway::default();
        gateway.channels.push(ChannelInfo {
            id: "C1".into(),
            name: "general".into(),
        });
        let (directory, gateway) = directory(gateway, clock.clone());

        assert!(directory.resolve_channel("general").await.unwrap().is_some());
        assert!(directory.resolve_channel("general").await.unwrap().is_some());
        assert_eq!(gateway.list_calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(601));
        assert!(directory.resolve_channel("general").await.unwrap().is_some());
        assert_eq!(gateway.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_user_is_not_admin_and_not_cached() {
        let clock = Arc::new(ManualClock::new());
        let (directory, gateway) = directory(CountingGateway::default(), clock);

        assert!(!directory.is_admin_or_owner("UGHOST").await.unwrap());
        assert!(!directory.is_admin_or_owner("UGHOST").await.unwrap());
        // A negative answer is not cached; each check asks upstream again.
        assert_eq!(gateway.user_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn mention_tokens_resolve_without_network() {
        let clock = Arc::new(ManualClock::new());
        let (directory, gateway) = directory(CountingGateway::default(), clock);

        let resolved = directory
            .resolve_channel("<#C024BE7LR|general>")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.id, "C024BE7LR");
        assert_eq!(resolved.name, "general");
        assert_eq!(gateway.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn name_miss_relists_once_then_gives_up() {
        let clock = Arc::new(ManualClock::new());
        let (directory, gateway) = directory(CountingGateway::default(), clock);

        assert!(directory.resolve_channel("#nowhere").await.unwrap().is_none());
        assert_eq!(gateway.list_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn mention_parsing_edge_cases() {
        assert!(parse_mention("<#C1|general>").is_some());
        assert!(parse_mention("<#C1>").is_some());
        assert!(parse_mention("#general").is_none());
        assert!(parse_mention("<#>").is_none());
        assert!(parse_mention("<@U1>").is_none());
    }
}
