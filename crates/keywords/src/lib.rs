//! The Keywords extension: keyword table, behavior toggles, and the admin
//! command surface.

pub mod config;
pub mod ext;
pub mod replies;
pub mod table;

pub use {
    config::{KeywordConfig, ToggleKind, ToggleSpec},
    ext::Keywords,
    table::{KeywordReply, KeywordTable},
};
