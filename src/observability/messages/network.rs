// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for network construction and lifecycle.
//!
//! This module contains message types for logging events related to:
//! * Link binding between units
//! * Network construction
//! * Network start and stop

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A linked channel was bound to its provider.
///
/// # Log Level
/// `debug!` - Construction detail
///
/// # Example
/// ```
/// use the_junction::observability::messages::network::ChannelLinked;
///
/// let msg = ChannelLinked {
///     unit: "double",
///     channel: "number",
///     provider_unit: "square",
///     provider_channel: "squares",
/// };
///
/// assert_eq!(msg.to_string(), "Linked double.number -> square.squares");
/// ```
pub struct ChannelLinked<'a> {
    pub unit: &'a str,
    pub channel: &'a str,
    pub provider_unit: &'a str,
    pub provider_channel: &'a str,
}

impl Display for ChannelLinked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Linked {}.{} -> {}.{}",
            self.unit, self.channel, self.provider_unit, self.provider_channel
        )
    }
}

impl StructuredLog for ChannelLinked<'_> {
    fn log(&self) {
        tracing::debug!(
            unit = self.unit,
            channel = self.channel,
            provider_unit = self.provider_unit,
            provider_channel = self.provider_channel,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "channel_linked",
            span_name = name,
            unit = self.unit,
            channel = self.channel,
            provider_unit = self.provider_unit,
            provider_channel = self.provider_channel,
        )
    }
}

/// Network construction finished.
///
/// # Log Level
/// `info!` - Important operational event
pub struct NetworkBuilt<'a> {
    pub network: &'a str,
    pub units: usize,
    pub routes: usize,
}

impl Display for NetworkBuilt<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Network '{}' built: {} units, {} routes",
            self.network, self.units, self.routes
        )
    }
}

impl StructuredLog for NetworkBuilt<'_> {
    fn log(&self) {
        tracing::info!(
            network = self.network,
            units = self.units,
            routes = self.routes,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "network_built",
            span_name = name,
            network = self.network,
            units = self.units,
            routes = self.routes,
        )
    }
}

/// Network started its children and itself.
///
/// # Log Level
/// `info!` - Important operational event
pub struct NetworkStarted<'a> {
    pub network: &'a str,
    pub units: usize,
}

impl Display for NetworkStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Network '{}' started with {} units", self.network, self.units)
    }
}

impl StructuredLog for NetworkStarted<'_> {
    fn log(&self) {
        tracing::info!(network = self.network, units = self.units, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "network_started",
            span_name = name,
            network = self.network,
            units = self.units,
        )
    }
}

pub struct NetworkStopped<'a> {
    pub network: &'a str,
}

impl Display for NetworkStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Network '{}' stopped", self.network)
    }
}

impl StructuredLog for NetworkStopped<'_> {
    fn log(&self) {
        tracing::info!(network = self.network, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("network_stopped", span_name = name, network = self.network)
    }
}
