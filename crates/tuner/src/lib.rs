//! Radio tuner: a local HTTP control surface for an FM or HD Radio receiver.
//!
//! A tune request rewrites the receiver's config file atomically, restarts
//! its service unit, and polls the audio mount until it answers, then
//! redirects the client to the mount.

pub mod api;
pub mod cli;
pub mod config;
pub mod config_writer;
pub mod openapi;
pub mod readiness;
pub mod service;
pub mod startup;
pub mod state;
pub mod tune;

/// Version string with commit and build date.
pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    ", ",
    env!("BUILD_DATE"),
    ")"
);
