// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Runtime errors raised by channels, units, networks and trips.
//!
//! Every variant is fail-fast: the engine never retries or logs-and-continues. Errors
//! raised inside a reactive function travel back through the `publish` call that
//! triggered it, so the caller at the outermost boundary sees the first failure.

use thiserror::Error;

/// Errors raised while wiring or driving a graph of units.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The addressed unit has no channel with this name.
    #[error("invalid unit: {unit} channel: {channel} combination")]
    InvalidChannel { unit: String, channel: String },

    /// A unit reference could not be resolved, or the unit can no longer accept messages.
    #[error("invalid unit: {unit} ({context})")]
    InvalidUnit { unit: String, context: String },

    /// A configured pipe stage was missing at the position it is applied.
    #[error("invalid pipe: {channel} source: pipe.index:{index}")]
    InvalidPipe { channel: String, index: usize },

    /// A linked channel was used before its provider channel could be bound.
    #[error("unresolved link: {unit}.{channel} -> {provider_unit}.{provider_channel}")]
    UnresolvedLink {
        unit: String,
        channel: String,
        provider_unit: String,
        provider_channel: String,
    },

    /// Another subscriber already claimed the trip forwarded on this channel.
    #[error("trip forwarded on channel '{channel}' was already taken")]
    TripTaken { channel: String },

    /// The network has no route with this name.
    #[error("network '{network}' has no route '{route}'")]
    UnknownRoute { network: String, route: String },

    /// A reactive function rejected its input.
    #[error("function on unit '{unit}' failed: {message}")]
    FunctionFailed { unit: String, message: String },
}

impl GraphError {
    pub fn invalid_channel(unit: impl Into<String>, channel: impl Into<String>) -> Self {
        GraphError::InvalidChannel {
            unit: unit.into(),
            channel: channel.into(),
        }
    }

    /// Unresolvable unit reference, named together with the container that asked for it.
    pub fn unresolved_unit(
        reference: impl Into<String>,
        container_unit: &str,
        container_channel: &str,
    ) -> Self {
        GraphError::InvalidUnit {
            unit: reference.into(),
            context: format!(
                "container: {{unit: {}, channel: {}}}",
                container_unit, container_channel
            ),
        }
    }

    pub fn stopped_unit(unit: impl Into<String>) -> Self {
        GraphError::InvalidUnit {
            unit: unit.into(),
            context: "unit is stopped".to_string(),
        }
    }

    pub fn function_failed(unit: impl Into<String>, message: impl Into<String>) -> Self {
        GraphError::FunctionFailed {
            unit: unit.into(),
            message: message.into(),
        }
    }
}

/// Result alias used throughout the engine.
pub type GraphResult<T> = Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_unit_names_container() {
        let err = GraphError::unresolved_unit("ghost", "network", "results");
        assert_eq!(
            err.to_string(),
            "invalid unit: ghost (container: {unit: network, channel: results})"
        );
    }

    #[test]
    fn test_invalid_pipe_message_carries_index() {
        let err = GraphError::InvalidPipe {
            channel: "number".to_string(),
            index: 2,
        };
        assert!(err.to_string().contains("pipe.index:2"));
        assert!(err.to_string().contains("number"));
    }
}
