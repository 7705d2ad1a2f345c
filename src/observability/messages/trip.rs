// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for trip forwarding.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A trip was forwarded to a hop.
///
/// # Log Level
/// `trace!` - Emitted once per hop
pub struct TripForwarded<'a> {
    pub unit: &'a str,
    pub channel: &'a str,
    pub remaining: usize,
}

impl Display for TripForwarded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Trip forwarded to {}.{} ({} hops remaining)",
            self.unit, self.channel, self.remaining
        )
    }
}

impl StructuredLog for TripForwarded<'_> {
    fn log(&self) {
        tracing::trace!(
            unit = self.unit,
            channel = self.channel,
            remaining = self.remaining,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!(
            "trip_forwarded",
            span_name = name,
            unit = self.unit,
            channel = self.channel,
            remaining = self.remaining,
        )
    }
}

/// `next()` was called on a trip with no hops left.
///
/// # Log Level
/// `debug!` - Harmless, but usually a handler continuing one hop too far
pub struct TripExhausted {
    pub hops_visited: usize,
}

impl Display for TripExhausted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Trip has no hops left after visiting {}",
            self.hops_visited
        )
    }
}

impl StructuredLog for TripExhausted {
    fn log(&self) {
        tracing::debug!(hops_visited = self.hops_visited, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "trip_exhausted",
            span_name = name,
            hops_visited = self.hops_visited,
        )
    }
}
