// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! This module provides centralized message types for diagnostic and operational
//! logging throughout the engine. Message types are plain structs that implement
//! `Display` for the human-readable line and `StructuredLog` for the typed
//! `tracing` fields, so log text never lives inline at the call site.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::unit` - unit lifecycle and reactive function failures
//! * `messages::network` - network construction, link binding and lifecycle
//! * `messages::trip` - trip forwarding and exhaustion
//! * `messages::config` - document loading, stages and validation
//!
//! # Usage
//!
//! ```rust
//! use the_junction::observability::messages::trip::TripExhausted;
//! use the_junction::observability::messages::StructuredLog;
//!
//! let msg = TripExhausted { hops_visited: 3 };
//! msg.log();
//! assert!(msg.to_string().contains('3'));
//! ```
//!
//! No subscriber is installed here; the binary sets up `tracing-subscriber` and
//! library users choose their own.

pub mod messages;
