// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Networks: a unit that owns child units and named routes.
//!
//! Construction runs in two passes so links may form cycles between siblings. The first
//! pass builds every unit's stored channels; the second binds links, repeating until no
//! pending link is left. Routes are resolved last, once every unit exists.

use std::collections::BTreeMap;
use std::ops::Deref;

use crate::config::{HopConfig, NetworkConfig};
use crate::engine::resolution::Resolution;
use crate::engine::trip::Hop;
use crate::engine::unit::{ChannelState, Unit};
use crate::errors::{GraphError, GraphResult};
use crate::observability::messages::network::{NetworkBuilt, NetworkStarted, NetworkStopped};
use crate::observability::messages::StructuredLog;

/// A unit plus its children. Dereferences to the network's own unit.
#[derive(Debug)]
pub struct Network {
    unit: Unit,
    units: BTreeMap<String, Unit>,
}

impl Network {
    pub fn new(config: NetworkConfig) -> GraphResult<Network> {
        let unit = Unit::local(&config.name, &config.own_unit());
        let units: BTreeMap<String, Unit> = config
            .units
            .iter()
            .map(|(name, child)| (name.clone(), Unit::local(name, child)))
            .collect();

        let resolution = Resolution::with_peers(&unit, &units);
        let mut all: Vec<&Unit> = vec![&unit];
        all.extend(units.values());
        resolution.bind_links(&all)?;

        let routes = config
            .routes
            .iter()
            .map(|(route, hops)| {
                let hops = hops
                    .iter()
                    .map(|hop| resolve_hop(&resolution, route, hop))
                    .collect::<GraphResult<Vec<Hop>>>()?;
                Ok((route.clone(), hops))
            })
            .collect::<GraphResult<BTreeMap<String, Vec<Hop>>>>()?;
        unit.set_routes(routes);

        NetworkBuilt {
            network: unit.name(),
            units: units.len(),
            routes: config.routes.len(),
        }
        .log();

        Ok(Network { unit, units })
    }

    /// Start every child, in name order, then the network's own unit.
    ///
    /// Every member's stored channels are reopened before any member wires its functions,
    /// so a restart re-links children to siblings later in the order.
    pub fn start(&self) -> GraphResult<()> {
        self.unit.reopen();
        for unit in self.units.values() {
            unit.reopen();
        }
        for unit in self.units.values() {
            unit.start()?;
        }
        self.unit.start()?;
        NetworkStarted {
            network: self.unit.name(),
            units: self.units.len(),
        }
        .log();
        Ok(())
    }

    /// Stop the network's own unit, then every child.
    pub fn stop(&self) {
        self.unit.stop();
        for unit in self.units.values() {
            unit.stop();
        }
        NetworkStopped {
            network: self.unit.name(),
        }
        .log();
    }

    /// A child by name, or the network's own unit under its own name.
    pub fn unit(&self, name: &str) -> GraphResult<&Unit> {
        if let Some(unit) = self.units.get(name) {
            return Ok(unit);
        }
        if name == self.unit.name() {
            return Ok(&self.unit);
        }
        Err(GraphError::InvalidUnit {
            unit: name.to_string(),
            context: format!("not a unit of network {}", self.unit.name()),
        })
    }

    pub fn units(&self) -> impl Iterator<Item = (&str, &Unit)> {
        self.units.iter().map(|(name, unit)| (name.as_str(), unit))
    }

    pub fn as_unit(&self) -> &Unit {
        &self.unit
    }
}

impl Deref for Network {
    type Target = Unit;

    fn deref(&self) -> &Unit {
        &self.unit
    }
}

fn resolve_hop(resolution: &Resolution<'_>, route: &str, hop: &HopConfig) -> GraphResult<Hop> {
    let target = resolution.resolve(&hop.unit, resolution.container().name(), route)?;
    if matches!(target.channel_state(&hop.channel), ChannelState::Missing) {
        return Err(GraphError::invalid_channel(target.name(), hop.channel.clone()));
    }
    let mut resolved = Hop::new(&target, hop.channel.clone())
        .with_unwrap(hop.unwrap.clone())
        .with_hooks(hop.map.clone(), hop.tap.clone());
    if let Some(request) = &hop.request {
        resolved = resolved.with_request(request.clone());
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChannelConfig, UnitConfig};

    #[test]
    fn test_unit_lookup() {
        let network = Network::new(
            NetworkConfig::new("net")
                .unit("a", UnitConfig::new("ignored").channel("c", ChannelConfig::new())),
        )
        .unwrap();
        assert_eq!(network.unit("a").unwrap().name(), "a");
        assert_eq!(network.unit("net").unwrap().name(), "net");
        assert!(network.unit("b").is_err());
        assert_eq!(network.name(), "net");
    }

    #[test]
    fn test_route_to_unknown_channel_is_rejected() {
        let err = Network::new(
            NetworkConfig::new("net")
                .unit("a", UnitConfig::new("a").channel("c", ChannelConfig::new()))
                .route("r", vec![HopConfig::new("a", "nope")]),
        )
        .unwrap_err();
        assert_eq!(err, GraphError::invalid_channel("a", "nope"));
    }

    #[test]
    fn test_route_to_unknown_unit_names_route() {
        let err = Network::new(
            NetworkConfig::new("net").route("r", vec![HopConfig::new("ghost", "c")]),
        )
        .unwrap_err();
        assert_eq!(err, GraphError::unresolved_unit("ghost", "net", "r"));
    }
}
