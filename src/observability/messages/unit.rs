// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for unit lifecycle and reactive function events.

use crate::errors::GraphError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Unit wired its reactive functions.
///
/// # Log Level
/// `debug!` - Per-unit lifecycle detail
pub struct UnitStarted<'a> {
    pub unit: &'a str,
    pub channels: usize,
    pub functions: usize,
}

impl Display for UnitStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Unit '{}' started: {} channels, {} functions",
            self.unit, self.channels, self.functions
        )
    }
}

impl StructuredLog for UnitStarted<'_> {
    fn log(&self) {
        tracing::debug!(
            unit = self.unit,
            channels = self.channels,
            functions = self.functions,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "unit_started",
            span_name = name,
            unit = self.unit,
            channels = self.channels,
            functions = self.functions,
        )
    }
}

/// Unit cancelled its subscriptions and closed its stored channels.
///
/// # Log Level
/// `debug!` - Per-unit lifecycle detail
pub struct UnitStopped<'a> {
    pub unit: &'a str,
    pub subscriptions: usize,
}

impl Display for UnitStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Unit '{}' stopped: {} subscriptions cancelled",
            self.unit, self.subscriptions
        )
    }
}

impl StructuredLog for UnitStopped<'_> {
    fn log(&self) {
        tracing::debug!(
            unit = self.unit,
            subscriptions = self.subscriptions,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "unit_stopped",
            span_name = name,
            unit = self.unit,
            subscriptions = self.subscriptions,
        )
    }
}

/// A reactive function returned an error.
///
/// # Log Level
/// `warn!` - The error still propagates to the publisher
pub struct FunctionFailed<'a> {
    pub unit: &'a str,
    pub channels: &'a [String],
    pub error: &'a GraphError,
}

impl Display for FunctionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Function on unit '{}' over [{}] failed: {}",
            self.unit,
            self.channels.join(", "),
            self.error
        )
    }
}

impl StructuredLog for FunctionFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            unit = self.unit,
            channels = self.channels.join(","),
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "function_failed",
            span_name = name,
            unit = self.unit,
            error = %self.error,
        )
    }
}

/// Unrecognized aggregation strategy tag; `first` is used instead.
///
/// # Log Level
/// `warn!` - Configuration probably has a typo
///
/// # Example
/// ```
/// use the_junction::observability::messages::unit::UnknownStrategy;
///
/// let msg = UnknownStrategy { tag: "latest" };
/// assert!(msg.to_string().contains("latest"));
/// ```
pub struct UnknownStrategy<'a> {
    pub tag: &'a str,
}

impl Display for UnknownStrategy<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Unknown aggregation strategy '{}', falling back to 'first'",
            self.tag
        )
    }
}

impl StructuredLog for UnknownStrategy<'_> {
    fn log(&self) {
        tracing::warn!(tag = self.tag, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("unknown_strategy", span_name = name, tag = self.tag)
    }
}
