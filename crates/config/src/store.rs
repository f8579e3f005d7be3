//! Persisted per-extension state: one JSON document per extension, rewritten
//! wholesale on every mutating command.

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    std::{
        collections::BTreeMap,
        path::{Path, PathBuf},
    },
    tracing::{debug, warn},
};

use crate::error::Result;

/// Everything an extension persists between restarts. Unknown document
/// fields are dropped; missing ones default, so state written by older
/// versions still loads.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExtensionState {
    pub keywords: BTreeMap<String, serde_json::Value>,
    pub config_data: BTreeMap<String, serde_json::Value>,
    pub template_text: String,
}

/// Durable storage for [`ExtensionState`] documents, keyed by extension name.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load an extension's state. Missing or unreadable state yields the
    /// empty default, never an error.
    async fn load(&self, extension: &str) -> ExtensionState;

    /// Replace an extension's state. Failure here must keep the previous
    /// on-disk document authoritative.
    async fn save(&self, extension: &str, state: &ExtensionState) -> Result<()>;
}

/// File-backed store: `<state_dir>/<extension>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, extension: &str) -> PathBuf {
        self.dir.join(format!("{extension}.json"))
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self, extension: &str) -> ExtensionState {
        let path = self.path_for(extension);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(extension, "no persisted state, starting empty");
                return ExtensionState::default();
            }
            Err(err) => {
                warn!(extension, %err, "could not read persisted state, starting empty");
                return ExtensionState::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(err) => {
                warn!(extension, %err, "persisted state is malformed, starting empty");
                ExtensionState::default()
            }
        }
    }

    async fn save(&self, extension: &str, state: &ExtensionState) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(extension);
        let rendered = serde_json::to_string_pretty(state)?;
        write_atomic(&path, &rendered).await?;
        debug!(extension, path = %path.display(), "persisted state");
        Ok(())
    }
}

/// Write via a sibling temp file and rename, so a crash mid-write never
/// leaves a truncated document.
async fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await
}
