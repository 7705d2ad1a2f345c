// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::{ChannelConfig, FunctionConfig, UnitConfig};
use crate::engine::{Inputs, Outputs, Unit};
use crate::errors::GraphResult;
use crate::stream::stages;

/// Input channel of a reduction unit.
pub const REDUCTIONS_CHANNEL: &str = "reductions";

/// A unit that hands every `count` values published on `reductions` to `func` as one batch.
///
/// `outputs` declares the channels `func` may publish on. A zero `count` makes the unit fail
/// to start with `InvalidPipe`.
pub fn reduction(
    name: impl Into<String>,
    count: usize,
    outputs: &[&str],
    func: impl Fn(&Unit, Inputs) -> GraphResult<Outputs> + 'static,
) -> UnitConfig {
    let mut config = UnitConfig::new(name).channel(
        REDUCTIONS_CHANNEL,
        ChannelConfig::new().pipes([stages::buffer_count(count)]),
    );
    for output in outputs {
        config = config.channel(*output, ChannelConfig::new());
    }
    config.function(FunctionConfig::new(&[REDUCTIONS_CHANNEL], func))
}
