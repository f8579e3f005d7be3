//! Bot settings and the per-extension persisted-state store.

pub mod error;
pub mod settings;
pub mod store;

pub use {
    error::{Error, Result},
    settings::BotSettings,
    store::{ExtensionState, JsonFileStore, StateStore},
};
