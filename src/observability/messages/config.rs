// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for configuration loading and validation.
//!
//! This module contains message types for logging events related to:
//! * Network document loading
//! * Validation failures and link cycles
//! * Registry lookups that produced no stage
//! * Values observed by `trace` stages

use crate::engine::Message;
use crate::errors::ValidationError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::path::Path;
use tracing::Span;

/// Network document parsed from disk.
///
/// # Log Level
/// `info!` - Important operational event
pub struct DocumentLoaded<'a> {
    pub path: &'a Path,
    pub format: &'a str,
    pub network: &'a str,
    pub units: usize,
    pub routes: usize,
}

impl Display for DocumentLoaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Loaded {} document {} for network '{}': {} units, {} routes",
            self.format,
            self.path.display(),
            self.network,
            self.units,
            self.routes
        )
    }
}

impl StructuredLog for DocumentLoaded<'_> {
    fn log(&self) {
        tracing::info!(
            path = %self.path.display(),
            format = self.format,
            network = self.network,
            units = self.units,
            routes = self.routes,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "document_loaded",
            span_name = name,
            path = %self.path.display(),
            format = self.format,
            network = self.network,
        )
    }
}

/// Document rejected by validation.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ValidationFailed<'a> {
    pub network: &'a str,
    pub errors: &'a [ValidationError],
}

impl Display for ValidationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Network '{}' failed validation with {} errors",
            self.network,
            self.errors.len()
        )
    }
}

impl StructuredLog for ValidationFailed<'_> {
    fn log(&self) {
        tracing::error!(
            network = self.network,
            error_count = self.errors.len(),
            "{}", self
        );
        for error in self.errors {
            tracing::error!(network = self.network, "{}", error);
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "validation_failed",
            span_name = name,
            network = self.network,
            error_count = self.errors.len(),
        )
    }
}

/// Linked channels loop back on themselves.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use the_junction::observability::messages::config::LinkCycleDetected;
///
/// let cycle = vec!["a.x".to_string(), "b.y".to_string(), "a.x".to_string()];
/// let msg = LinkCycleDetected { cycle: &cycle };
///
/// assert_eq!(msg.to_string(), "Link cycle detected: a.x -> b.y -> a.x");
/// ```
pub struct LinkCycleDetected<'a> {
    pub cycle: &'a [String],
}

impl Display for LinkCycleDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Link cycle detected: {}", self.cycle.join(" -> "))
    }
}

impl StructuredLog for LinkCycleDetected<'_> {
    fn log(&self) {
        tracing::error!(
            cycle = self.cycle.join(" -> "),
            cycle_length = self.cycle.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "link_cycle_detected",
            span_name = name,
            cycle = self.cycle.join(" -> "),
        )
    }
}

/// A pipe named a stage the registry could not build.
///
/// # Log Level
/// `warn!` - The pipe fails when the channel is first subscribed
pub struct UnknownStage<'a> {
    pub unit: &'a str,
    pub channel: &'a str,
    pub stage: &'a str,
}

impl Display for UnknownStage<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage '{}' on {}.{} could not be built",
            self.stage, self.unit, self.channel
        )
    }
}

impl StructuredLog for UnknownStage<'_> {
    fn log(&self) {
        tracing::warn!(
            unit = self.unit,
            channel = self.channel,
            stage = self.stage,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "unknown_stage",
            span_name = name,
            unit = self.unit,
            channel = self.channel,
            stage = self.stage,
        )
    }
}

/// A value passed through a `trace` stage.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct StageObserved<'a> {
    pub label: &'a str,
    pub message: &'a Message,
}

impl Display for StageObserved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "[{}] {:?}", self.label, self.message)
    }
}

impl StructuredLog for StageObserved<'_> {
    fn log(&self) {
        tracing::debug!(label = self.label, message = ?self.message, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("stage_observed", span_name = name, label = self.label)
    }
}
