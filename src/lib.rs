// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;     // unit/network configuration, documents, registry
pub mod engine;     // channels, units, networks, trips
pub mod errors;     // error handling
pub mod observability;
pub mod prefabs;    // ready-made units
pub mod stream;     // synchronous push streams
