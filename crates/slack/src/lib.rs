//! Slack Web API collaborator and the workspace directory cache.

pub mod api;
pub mod directory;
pub mod error;
pub mod web;

pub use {
    api::SlackGateway,
    directory::{CACHE_TTL, Directory},
    error::{Error, Result},
    web::WebGateway,
};
