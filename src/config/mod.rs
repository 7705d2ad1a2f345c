// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod builtins;
mod graph;
mod loader;
mod registry;
mod validation;

pub mod consts;

pub use graph::{
    ChannelConfig, FunctionConfig, HopConfig, NetworkConfig, ProviderConfig, Transform,
    UnitConfig,
};
pub use loader::{
    build_network, load_and_validate, load_document, load_network, parse_document,
    ChannelDocument, DocumentFormat, FunctionDocument, HopDocument, NetworkDocument, PipeDocument,
    ProviderDocument, UnitDocument,
};
pub use registry::{FunctionFactory, Registry, StageFactory};
pub use validation::validate_network_document;
