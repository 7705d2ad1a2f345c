// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-memory configuration for units and networks.
//!
//! These are the values [`Unit::new`] and [`Network::new`] consume. They can be built
//! directly in code with the builder methods below, or produced from a configuration
//! document by [`crate::config::build_network`].

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::engine::{
    Inputs, Message, Outputs, RequestFn, RequestTap, Strategy, Unit, UnitReference, Unwrap,
};
use crate::errors::GraphResult;
use crate::stream::stages::Stage;

/// Body of a reactive function.
pub type Transform = Rc<dyn Fn(&Unit, Inputs) -> GraphResult<Outputs>>;

/// Where a linked channel takes its stream from.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub unit: UnitReference,
    pub channel: String,
}

#[derive(Clone, Default)]
pub struct ChannelConfig {
    /// Initial value; implies `stateful`.
    pub default: Option<Message>,
    pub stateful: bool,
    /// `None` marks a stage that could not be built.
    pub pipes: Vec<Option<Stage>>,
    pub provider: Option<ProviderConfig>,
}

impl ChannelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stateful() -> Self {
        Self {
            stateful: true,
            ..Self::default()
        }
    }

    pub fn linked(unit: impl Into<UnitReference>, channel: impl Into<String>) -> Self {
        Self {
            provider: Some(ProviderConfig {
                unit: unit.into(),
                channel: channel.into(),
            }),
            ..Self::default()
        }
    }

    pub fn with_default(mut self, value: impl Into<Message>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn pipe(mut self, stage: Stage) -> Self {
        self.pipes.push(Some(stage));
        self
    }

    pub fn pipes(mut self, stages: impl IntoIterator<Item = Option<Stage>>) -> Self {
        self.pipes.extend(stages);
        self
    }

    pub fn is_linked(&self) -> bool {
        self.provider.is_some()
    }
}

impl fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelConfig")
            .field("default", &self.default)
            .field("stateful", &self.stateful)
            .field("pipes", &self.pipes.len())
            .field("provider", &self.provider)
            .finish()
    }
}

/// A reactive function: an aggregation over `channels` feeding `func`.
#[derive(Clone)]
pub struct FunctionConfig {
    pub strategy: Strategy,
    pub channels: Vec<String>,
    pub func: Transform,
}

impl FunctionConfig {
    pub fn new(
        channels: &[&str],
        func: impl Fn(&Unit, Inputs) -> GraphResult<Outputs> + 'static,
    ) -> Self {
        Self {
            strategy: Strategy::default(),
            channels: channels.iter().map(|c| c.to_string()).collect(),
            func: Rc::new(func),
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }
}

impl fmt::Debug for FunctionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionConfig")
            .field("strategy", &self.strategy)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct UnitConfig {
    pub name: String,
    pub channels: BTreeMap<String, ChannelConfig>,
    pub functions: Vec<FunctionConfig>,
}

impl UnitConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn channel(mut self, name: impl Into<String>, config: ChannelConfig) -> Self {
        self.channels.insert(name.into(), config);
        self
    }

    pub fn function(mut self, function: FunctionConfig) -> Self {
        self.functions.push(function);
        self
    }
}

/// One hop of a named route.
#[derive(Clone)]
pub struct HopConfig {
    pub unit: UnitReference,
    pub channel: String,
    pub request: Option<Value>,
    pub unwrap: Unwrap,
    pub map: Option<RequestFn>,
    pub tap: Option<RequestTap>,
}

impl HopConfig {
    pub fn new(unit: impl Into<UnitReference>, channel: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            channel: channel.into(),
            request: None,
            unwrap: Unwrap::Trip,
            map: None,
            tap: None,
        }
    }

    pub fn request(mut self, request: Value) -> Self {
        self.request = Some(request);
        self
    }

    pub fn unwrap(mut self, unwrap: Unwrap) -> Self {
        self.unwrap = unwrap;
        self
    }

    pub fn map(mut self, f: impl Fn(&Value) -> Value + 'static) -> Self {
        self.map = Some(Rc::new(f));
        self
    }

    pub fn tap(mut self, f: impl Fn(&Value) + 'static) -> Self {
        self.tap = Some(Rc::new(f));
        self
    }
}

impl fmt::Debug for HopConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HopConfig")
            .field("unit", &self.unit)
            .field("channel", &self.channel)
            .field("request", &self.request)
            .field("unwrap", &self.unwrap)
            .finish_non_exhaustive()
    }
}

/// A network's own unit configuration plus its children and routes.
#[derive(Debug, Clone, Default)]
pub struct NetworkConfig {
    pub name: String,
    pub channels: BTreeMap<String, ChannelConfig>,
    pub functions: Vec<FunctionConfig>,
    /// Child units keyed by name; the key wins over any `name` inside the config.
    pub units: BTreeMap<String, UnitConfig>,
    pub routes: BTreeMap<String, Vec<HopConfig>>,
}

impl NetworkConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn channel(mut self, name: impl Into<String>, config: ChannelConfig) -> Self {
        self.channels.insert(name.into(), config);
        self
    }

    pub fn function(mut self, function: FunctionConfig) -> Self {
        self.functions.push(function);
        self
    }

    pub fn unit(mut self, name: impl Into<String>, config: UnitConfig) -> Self {
        self.units.insert(name.into(), config);
        self
    }

    pub fn route(mut self, name: impl Into<String>, hops: Vec<HopConfig>) -> Self {
        self.routes.insert(name.into(), hops);
        self
    }

    /// The network's own channels and functions as a unit configuration.
    pub fn own_unit(&self) -> UnitConfig {
        UnitConfig {
            name: self.name.clone(),
            channels: self.channels.clone(),
            functions: self.functions.clone(),
        }
    }
}
