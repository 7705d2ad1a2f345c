// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;

use crate::config::{ChannelConfig, FunctionConfig, UnitConfig};
use crate::engine::{Outputs, Strategy};
use crate::errors::GraphError;

/// Field whose value names the target channel.
pub const PARTITION_KEY: &str = "type";

/// A unit that republishes every value from `source` on the channel named by its `type` field.
///
/// A value whose `type` names no target fails with `InvalidChannel`; a value without a string
/// `type` fails with `FunctionFailed`.
pub fn partition(name: impl Into<String>, source: &str, targets: &[&str]) -> UnitConfig {
    let mut config = UnitConfig::new(name).channel(source, ChannelConfig::new());
    for target in targets {
        config = config.channel(*target, ChannelConfig::new());
    }

    config.function(
        FunctionConfig::new(&[source], |_, inputs| {
            let value = inputs.value(0)?;
            let target = value
                .get(PARTITION_KEY)
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    GraphError::function_failed(
                        inputs.unit(),
                        format!("value has no string '{}' field", PARTITION_KEY),
                    )
                })?;
            Ok(Outputs::one(target, value.clone()))
        })
        .with_strategy(Strategy::First),
    )
}
