//! The keyword table: whole-word matching plus conversion to and from the
//! persisted JSON document.

use {
    serde::{Deserialize, Serialize},
    std::collections::{BTreeMap, HashSet},
    tracing::warn,
};

/// What a keyword answers with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum KeywordReply {
    /// Fixed text, sent verbatim.
    Text(String),
    /// Channel references rendered through the shared template at send time.
    Channels(Vec<String>),
}

/// Keywords mapped to replies. Keys are stored sanitized, so lookups against
/// sanitized message text are exact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordTable {
    entries: BTreeMap<String, KeywordReply>,
}

impl KeywordTable {
    /// First keyword appearing as a whole word in `sanitized`. At most one
    /// match is honored per message.
    #[must_use]
    pub fn find_match(&self, sanitized: &str) -> Option<(&str, &KeywordReply)> {
        let words: HashSet<&str> = sanitized.split_whitespace().collect();
        self.entries
            .iter()
            .find(|(keyword, _)| words.contains(keyword.as_str()))
            .map(|(keyword, reply)| (keyword.as_str(), reply))
    }

    pub fn insert(&mut self, keyword: impl Into<String>, reply: KeywordReply) {
        self.entries.insert(keyword.into(), reply);
    }

    /// Remove a keyword; `false` when it was not present.
    pub fn remove(&mut self, keyword: &str) -> bool {
        self.entries.remove(keyword).is_some()
    }

    #[must_use]
    pub fn contains(&self, keyword: &str) -> bool {
        self.entries.contains_key(keyword)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &KeywordReply)> {
        self.entries
            .iter()
            .map(|(keyword, reply)| (keyword.as_str(), reply))
    }

    /// Rebuild from a persisted document. Entries that are neither a string
    /// nor a string array are skipped with a warning instead of poisoning
    /// the whole table.
    #[must_use]
    pub fn from_document(document: &BTreeMap<String, serde_json::Value>) -> Self {
        let mut table = Self::default();
        for (keyword, value) in document {
            match serde_json::from_value::<KeywordReply>(value.clone()) {
                Ok(reply) => table.insert(keyword.clone(), reply),
                Err(err) => {
                    warn!(%keyword, %err, "skipping malformed keyword entry");
                }
            }
        }
        table
    }

    #[must_use]
    pub fn to_document(&self) -> BTreeMap<String, serde_json::Value> {
        self.entries
            .iter()
            .filter_map(|(keyword, reply)| {
                serde_json::to_value(reply)
                    .ok()
                    .map(|value| (keyword.clone(), value))
            })
            .collect()
    }
}
