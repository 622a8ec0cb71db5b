//! # confcache - config-file serving cache
//!
//! A gray-release-aware, watch-indexed, weight-bounded cache that serves
//! rendered configuration files over HTTP.
//!
//! ## Architecture
//!
//! - `key`: cache-key composition and namespace normalization
//! - `codec`: properties / JSON / raw rendering
//! - `watch_index`: bidirectional watch-key <-> cache-key relation
//! - `cache`: weight- and TTL-bounded cache engine
//! - `collaborators`: external resolver / gray-rule / watch-key-deriver traits
//! - `pipeline`: the per-request state machine
//! - `message_bus` / `invalidator`: release-change consumption
//! - `http`: the three `/configfiles/...` routes
//! - `config`: environment-based process configuration
//! - `error`: the crate's unified error type

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod codec;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod http;
pub mod invalidator;
pub mod key;
pub mod message_bus;
pub mod pipeline;
pub mod watch_index;

/// Re-export version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
