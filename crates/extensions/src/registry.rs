//! Extension lifecycle registry: registered → loaded → enabled, plus the
//! per-conversation enablement scopes.

use {
    std::{
        collections::{HashMap, HashSet},
        sync::Arc,
    },
    tracing::{debug, info},
    watchword_common::types::MessageEvent,
};

use crate::{
    error::{Error, Result},
    plugin::{Extension, ExtensionFactory, ExtensionHost},
};

struct ExtensionRecord {
    name: String,
    factory: ExtensionFactory,
    instance: Option<Arc<dyn Extension>>,
    enabled: bool,
    enabled_for_im: bool,
    enabled_for_channels: HashSet<String>,
}

impl ExtensionRecord {
    fn loaded(&self) -> bool {
        self.instance.is_some()
    }
}

/// Registry of every extension the process knows about. Records are created
/// at registration and never removed; lifecycle state lives for the process.
#[derive(Default)]
pub struct ExtensionRegistry {
    records: HashMap<String, ExtensionRecord>,
}

impl ExtensionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, name: &str) -> Result<&ExtensionRecord> {
        self.records
            .get(&name.to_lowercase())
            .ok_or_else(|| Error::NotRegistered(name.to_owned()))
    }

    fn record_mut(&mut self, name: &str) -> Result<&mut ExtensionRecord> {
        self.records
            .get_mut(&name.to_lowercase())
            .ok_or_else(|| Error::NotRegistered(name.to_owned()))
    }

    /// Register an extension under its name. Idempotent: registering a name
    /// that already exists (case-insensitively) leaves the first
    /// registration in place.
    pub fn register(&mut self, name: &str, factory: ExtensionFactory) {
        let key = name.to_lowercase();
        if self.records.contains_key(&key) {
            debug!(extension = name, "already registered, keeping first");
            return;
        }
        info!(extension = name, "registered");
        self.records.insert(
            key,
            ExtensionRecord {
                name: name.to_owned(),
                factory,
                instance: None,
                enabled: false,
                enabled_for_im: false,
                enabled_for_channels: HashSet::new(),
            },
        );
    }

    /// Instantiate an extension via its factory. Loading an already-loaded
    /// extension is a no-op; loading an unregistered name fails.
    pub async fn load(&mut self, name: &str, host: &ExtensionHost) -> Result<()> {
        let record = self.record(name)?;
        if record.loaded() {
            debug!(extension = name, "already loaded");
            return Ok(());
        }
        let factory = Arc::clone(&record.factory);
        let instance = factory(host.clone()).await.map_err(|source| Error::Load {
            name: name.to_owned(),
            source,
        })?;
        info!(extension = name, "loaded");
        // Registration is checked above; the record still exists.
        if let Some(record) = self.records.get_mut(&name.to_lowercase()) {
            record.instance = Some(instance);
        }
        Ok(())
    }

    /// Load every registered extension, stopping at the first failure.
    pub async fn load_all(&mut self, host: &ExtensionHost) -> Result<()> {
        let names: Vec<String> = self.records.values().map(|r| r.name.clone()).collect();
        for name in names {
            self.load(&name, host).await?;
        }
        Ok(())
    }

    /// Flip the global gate on. Requires the extension to be loaded.
    pub fn enable(&mut self, name: &str) -> Result<()> {
        let record = self.record_mut(name)?;
        if !record.loaded() {
            return Err(Error::NotLoaded(name.to_owned()));
        }
        record.enabled = true;
        info!(extension = name, "enabled");
        Ok(())
    }

    /// Flip the global gate off. Fails unless currently enabled. Scoped
    /// flags survive, inert until re-enabled.
    pub fn disable(&mut self, name: &str) -> Result<()> {
        let record = self.record_mut(name)?;
        if !record.enabled {
            return Err(Error::NotEnabled(name.to_owned()));
        }
        record.enabled = false;
        info!(extension = name, "disabled");
        Ok(())
    }

    /// Enable every loaded extension, everywhere it can be scoped.
    pub fn enable_all(&mut self) -> Result<()> {
        let names: Vec<String> = self
            .records
            .values()
            .filter(|r| r.loaded())
            .map(|r| r.name.clone())
            .collect();
        for name in &names {
            self.enable(name)?;
            self.enable_for_im(name)?;
        }
        Ok(())
    }

    /// Add a channel to the extension's allow-set.
    pub fn enable_for(&mut self, name: &str, channel: &str) -> Result<()> {
        let record = self.record_mut(name)?;
        record.enabled_for_channels.insert(channel.to_owned());
        debug!(extension = name, channel, "enabled for channel");
        Ok(())
    }

    /// Remove a channel from the allow-set. Removing an absent channel is
    /// a no-op.
    pub fn disable_for(&mut self, name: &str, channel: &str) -> Result<()> {
        let record = self.record_mut(name)?;
        record.enabled_for_channels.remove(channel);
        debug!(extension = name, channel, "disabled for channel");
        Ok(())
    }

    pub fn enable_for_im(&mut self, name: &str) -> Result<()> {
        self.record_mut(name)?.enabled_for_im = true;
        Ok(())
    }

    pub fn disable_for_im(&mut self, name: &str) -> Result<()> {
        self.record_mut(name)?.enabled_for_im = false;
        Ok(())
    }

    /// The two-tier enablement gate: the global flag must be on, then the
    /// event's conversation must pass the matching scope (IM flag for direct
    /// messages, channel allow-set otherwise). Unregistered names are simply
    /// not enabled.
    #[must_use]
    pub fn is_enabled_for(&self, name: &str, event: &MessageEvent) -> bool {
        let Ok(record) = self.record(name) else {
            return false;
        };
        if !record.enabled {
            return false;
        }
        if event.channel_type.is_im() {
            record.enabled_for_im
        } else {
            record.enabled_for_channels.contains(&event.channel)
        }
    }

    /// Instance handle for a loaded extension.
    #[must_use]
    pub fn instance(&self, name: &str) -> Option<Arc<dyn Extension>> {
        self.records
            .get(&name.to_lowercase())
            .and_then(|record| record.instance.clone())
    }

    /// Instances that should see `event`, in registration-map order.
    #[must_use]
    pub fn enabled_instances(&self, event: &MessageEvent) -> Vec<Arc<dyn Extension>> {
        self.records
            .values()
            .filter(|record| self.is_enabled_for(&record.name, event))
            .filter_map(|record| record.instance.clone())
            .collect()
    }

    /// Lifecycle summary lines for `extension list`.
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .records
            .values()
            .map(|record| {
                let state = if record.enabled {
                    "enabled"
                } else if record.loaded() {
                    "loaded"
                } else {
                    "registered"
                };
                format!("{} ({state})", record.name)
            })
            .collect();
        lines.sort();
        lines
    }

    /// Registered names, sorted, for help output.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.records.values().map(|r| r.name.clone()).collect();
        names.sort();
        names
    }
}
