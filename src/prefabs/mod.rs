// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Ready-made unit configurations.
//!
//! Each prefab returns a [`UnitConfig`](crate::config::UnitConfig), so it can be built
//! standalone with [`Unit::new`](crate::engine::Unit::new) or placed inside a network.

mod partition;
mod reduction;

pub use partition::{partition, PARTITION_KEY};
pub use reduction::{reduction, REDUCTIONS_CHANNEL};
