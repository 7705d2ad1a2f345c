// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

/// Problems found while validating a network document before it is compiled
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A function names an implementation the registry does not know
    UnknownFunction {
        /// Unit declaring the function
        unit: String,
        /// The unregistered implementation name
        function: String,
    },
    /// A function declares no input channels
    EmptyFunctionInputs {
        unit: String,
        /// Position of the function in the unit's function list
        index: usize,
    },
    /// A function input is not a channel declared on its unit
    UndeclaredInput {
        unit: String,
        index: usize,
        channel: String,
    },
    /// A provider or hop references a unit that is not part of the network
    UnknownUnitReference {
        /// Where the reference was found, e.g. `double.number` or `route equationone`
        origin: String,
        /// The unit name that could not be found
        unit: String,
    },
    /// A child unit uses the network's own name, which makes references ambiguous
    ShadowedNetworkName { unit: String },
    /// Linked channels that only point at each other and never reach a stored channel
    LinkCycle {
        /// The cycle path, as `unit.channel` entries
        cycle: Vec<String>,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::UnknownFunction { unit, function } => {
                write!(
                    f,
                    "Unit '{}' uses function '{}' which is not registered",
                    unit, function
                )
            }
            ValidationError::EmptyFunctionInputs { unit, index } => {
                write!(f, "Function #{} on unit '{}' declares no input channels", index, unit)
            }
            ValidationError::UndeclaredInput {
                unit,
                index,
                channel,
            } => {
                write!(
                    f,
                    "Function #{} on unit '{}' reads channel '{}' which does not exist",
                    index, unit, channel
                )
            }
            ValidationError::UnknownUnitReference { origin, unit } => {
                write!(f, "'{}' references unit '{}' which does not exist", origin, unit)
            }
            ValidationError::ShadowedNetworkName { unit } => {
                write!(f, "Child unit '{}' shadows the network name", unit)
            }
            ValidationError::LinkCycle { cycle } => {
                write!(f, "Linked channels form a cycle: {}", cycle.join(" -> "))
            }
        }
    }
}

impl std::error::Error for ValidationError {}
