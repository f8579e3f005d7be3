//! Shared types, error-context plumbing, and the clock abstraction used
//! across the watchword crates.

pub mod clock;
pub mod error;
pub mod types;

pub use {
    clock::{Clock, SystemClock},
    error::FromMessage,
};
