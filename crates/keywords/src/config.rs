//! Behavior toggles with an explicit schema: keys, types, and descriptions
//! are declared here, and values are validated when a command sets them.

use std::collections::BTreeMap;

/// Declared value type of a configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleKind {
    Bool,
    Text,
}

impl ToggleKind {
    #[must_use]
    pub fn expected(self) -> &'static str {
        match self {
            Self::Bool => "Expected value: True or False.",
            Self::Text => "Expected value: free text.",
        }
    }
}

/// One schema row.
#[derive(Debug, Clone, Copy)]
pub struct ToggleSpec {
    pub key: &'static str,
    pub kind: ToggleKind,
    pub description: &'static str,
}

pub const TOGGLES: &[ToggleSpec] = &[
    ToggleSpec {
        key: "reply_in_thread",
        kind: ToggleKind::Bool,
        description: "The bot will reply publicly inside a thread.",
    },
    ToggleSpec {
        key: "reply_in_ephemeral",
        kind: ToggleKind::Bool,
        description: "The bot will reply privately.",
    },
    ToggleSpec {
        key: "reply_to_admins",
        kind: ToggleKind::Bool,
        description: "The bot will reply to admins if they say keywords.",
    },
    ToggleSpec {
        key: "reply_to_replies",
        kind: ToggleKind::Bool,
        description: "The bot will reply to replies in threads (False = replies only to top-level messages)",
    },
];

/// Why a `keyword config` mutation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSetError {
    UnknownKey,
    InvalidValue,
}

/// The live toggle values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordConfig {
    pub reply_in_thread: bool,
    pub reply_in_ephemeral: bool,
    pub reply_to_admins: bool,
    pub reply_to_replies: bool,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            reply_in_thread: true,
            reply_in_ephemeral: false,
            reply_to_admins: true,
            reply_to_replies: false,
        }
    }
}

impl KeywordConfig {
    /// Set a key from sanitized command text. The value must parse for the
    /// key's declared kind.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigSetError> {
        let spec = TOGGLES
            .iter()
            .find(|spec| spec.key == key)
            .ok_or(ConfigSetError::UnknownKey)?;
        match spec.kind {
            ToggleKind::Bool => {
                let parsed = parse_bool(value).ok_or(ConfigSetError::InvalidValue)?;
                match key {
                    "reply_in_thread" => self.reply_in_thread = parsed,
                    "reply_in_ephemeral" => self.reply_in_ephemeral = parsed,
                    "reply_to_admins" => self.reply_to_admins = parsed,
                    "reply_to_replies" => self.reply_to_replies = parsed,
                    _ => return Err(ConfigSetError::UnknownKey),
                }
            }
            // No text-kinded key is declared for this extension.
            ToggleKind::Text => return Err(ConfigSetError::UnknownKey),
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<bool> {
        match key {
            "reply_in_thread" => Some(self.reply_in_thread),
            "reply_in_ephemeral" => Some(self.reply_in_ephemeral),
            "reply_to_admins" => Some(self.reply_to_admins),
            "reply_to_replies" => Some(self.reply_to_replies),
            _ => None,
        }
    }

    /// Rebuild from a persisted document; unknown keys and wrongly typed
    /// values fall back to the defaults.
    #[must_use]
    pub fn from_document(document: &BTreeMap<String, serde_json::Value>) -> Self {
        let mut config = Self::default();
        for spec in TOGGLES {
            if let Some(value) = document.get(spec.key).and_then(serde_json::Value::as_bool) {
                // set() cannot fail for a declared key with a bool value.
                let _ = config.set(spec.key, if value { "true" } else { "false" });
            }
        }
        config
    }

    #[must_use]
    pub fn to_document(&self) -> BTreeMap<String, serde_json::Value> {
        TOGGLES
            .iter()
            .filter_map(|spec| {
                self.get(spec.key)
                    .map(|value| (spec.key.to_owned(), serde_json::Value::Bool(value)))
            })
            .collect()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
