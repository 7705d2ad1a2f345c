// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod graph;
mod loader;

pub use config::ValidationError;
pub use graph::{GraphError, GraphResult};
pub use loader::LoaderError;
