// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for human-readable output and
//! [`StructuredLog`] to emit itself as a `tracing` event with typed fields.
//!
//! # Organization
//!
//! * `unit` - unit lifecycle and reactive function events
//! * `network` - network construction, link binding and lifecycle
//! * `trip` - trip forwarding
//! * `config` - configuration loading, registry lookups and validation
//!
//! # Usage Pattern
//!
//! ```rust
//! use the_junction::observability::messages::network::NetworkStarted;
//! use the_junction::observability::messages::StructuredLog;
//!
//! let msg = NetworkStarted {
//!     network: "equations",
//!     units: 3,
//! };
//!
//! msg.log();
//! ```

use tracing::Span;

pub mod config;
pub mod network;
pub mod trip;
pub mod unit;

/// A message that knows its own log level and fields.
pub trait StructuredLog {
    /// Emit the message as a `tracing` event.
    fn log(&self);

    /// A span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
