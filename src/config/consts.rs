// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Request key the hop builtins read and write.
pub const INPUT_KEY: &str = "input";
/// Request key `hop_scale` multiplies by.
pub const FACTOR_KEY: &str = "factor";
/// Request key `dispatch_route` reads the route name from.
pub const ROUTE_KEY: &str = "route";

/// Default output channel of the `square` builtin.
pub const SQUARES_CHANNEL: &str = "squares";
/// Default output channel of the `double` builtin.
pub const DOUBLES_CHANNEL: &str = "doubles";
/// Default output channel of the `sum_batch` builtin.
pub const SUM_CHANNEL: &str = "sum";
/// Default output channel of the `product_batch` builtin.
pub const PRODUCT_CHANNEL: &str = "product";
/// Default output channel of the `collect_result` builtin.
pub const ANSWERS_CHANNEL: &str = "answers";
