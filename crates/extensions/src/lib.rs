//! Extension lifecycle, command routing, reply delivery, and dispatch.

pub mod delivery;
pub mod dispatch;
pub mod error;
pub mod manager;
pub mod plugin;
pub mod registry;
pub mod router;

pub use {
    delivery::{CHANNELS_PLACEHOLDER, DeliveryMode, Reply, ReplyBody, ReplyDelivery},
    dispatch::Dispatcher,
    error::{Error, Result},
    manager::ExtensionManager,
    plugin::{Extension, ExtensionFactory, ExtensionHost},
    registry::ExtensionRegistry,
    router::RouteOutcome,
};
