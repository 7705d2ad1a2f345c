// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Turning unit references into units, and pending links into channels.

use std::collections::BTreeMap;
use std::fmt;

use crate::engine::channel::Channel;
use crate::engine::unit::{ChannelState, PendingLink, Unit};
use crate::errors::{GraphError, GraphResult};
use crate::observability::messages::network::ChannelLinked;
use crate::observability::messages::StructuredLog;

/// How a link or hop names the unit it points at.
#[derive(Clone)]
pub enum UnitReference {
    /// For a link, the unit that owns the linked channel. For a hop, the network.
    Current,
    Name(String),
    Instance(Unit),
}

impl UnitReference {
    pub fn describe(&self) -> String {
        match self {
            UnitReference::Current => "<current>".to_string(),
            UnitReference::Name(name) => name.clone(),
            UnitReference::Instance(unit) => unit.name().to_string(),
        }
    }
}

impl fmt::Debug for UnitReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitReference::Current => write!(f, "Current"),
            UnitReference::Name(name) => f.debug_tuple("Name").field(name).finish(),
            UnitReference::Instance(unit) => f.debug_tuple("Instance").field(&unit.name()).finish(),
        }
    }
}

impl From<&str> for UnitReference {
    fn from(name: &str) -> Self {
        UnitReference::Name(name.to_string())
    }
}

impl From<String> for UnitReference {
    fn from(name: String) -> Self {
        UnitReference::Name(name)
    }
}

impl From<&Unit> for UnitReference {
    fn from(unit: &Unit) -> Self {
        UnitReference::Instance(unit.clone())
    }
}

impl From<Unit> for UnitReference {
    fn from(unit: Unit) -> Self {
        UnitReference::Instance(unit)
    }
}

/// Resolution context: the container unit and, inside a network, its peers.
///
/// Lookup order is peers by name, then the container by its own name, then an explicit
/// instance.
pub struct Resolution<'a> {
    container: &'a Unit,
    peers: Option<&'a BTreeMap<String, Unit>>,
}

impl<'a> Resolution<'a> {
    pub fn new(container: &'a Unit) -> Self {
        Self {
            container,
            peers: None,
        }
    }

    pub fn with_peers(container: &'a Unit, peers: &'a BTreeMap<String, Unit>) -> Self {
        Self {
            container,
            peers: Some(peers),
        }
    }

    pub fn container(&self) -> &Unit {
        self.container
    }

    /// Resolve `reference` on behalf of `(origin_unit, origin_channel)`.
    pub fn resolve(
        &self,
        reference: &UnitReference,
        origin_unit: &str,
        origin_channel: &str,
    ) -> GraphResult<Unit> {
        match reference {
            UnitReference::Current => Ok(self.container.clone()),
            UnitReference::Instance(unit) => Ok(unit.clone()),
            UnitReference::Name(name) => {
                if let Some(unit) = self.peers.and_then(|peers| peers.get(name)) {
                    return Ok(unit.clone());
                }
                if name == self.container.name() {
                    return Ok(self.container.clone());
                }
                Err(GraphError::unresolved_unit(
                    name.clone(),
                    origin_unit,
                    origin_channel,
                ))
            }
        }
    }

    /// Bind every pending link of `units`.
    ///
    /// Links whose provider is itself a pending link are deferred to the next pass. A pass
    /// that binds nothing while links remain means a cycle or a dangling provider.
    pub(crate) fn bind_links(&self, units: &[&Unit]) -> GraphResult<()> {
        let mut pending: Vec<(Unit, String, PendingLink)> = units
            .iter()
            .flat_map(|unit| {
                unit.pending_links()
                    .into_iter()
                    .map(move |(name, link)| ((*unit).clone(), name, link))
            })
            .collect();

        while !pending.is_empty() {
            let mut deferred = Vec::new();
            let mut bound = 0;

            for (unit, name, link) in pending {
                let provider = match &link.provider.unit {
                    UnitReference::Current => unit.clone(),
                    reference => self.resolve(reference, unit.name(), &name)?,
                };
                match provider.channel_state(&link.provider.channel) {
                    ChannelState::Ready(channel) => {
                        unit.bind(
                            &name,
                            Channel::linked(unit.name(), &name, channel, &link.pipes),
                        );
                        ChannelLinked {
                            unit: unit.name(),
                            channel: &name,
                            provider_unit: provider.name(),
                            provider_channel: &link.provider.channel,
                        }
                        .log();
                        bound += 1;
                    }
                    ChannelState::Pending => deferred.push((unit, name, link)),
                    ChannelState::Missing => {
                        return Err(GraphError::invalid_channel(
                            provider.name(),
                            link.provider.channel.clone(),
                        ))
                    }
                }
            }

            if bound == 0 {
                if let Some((unit, name, link)) = deferred.first() {
                    return Err(GraphError::UnresolvedLink {
                        unit: unit.name().to_string(),
                        channel: name.clone(),
                        provider_unit: link.provider.unit.describe(),
                        provider_channel: link.provider.channel.clone(),
                    });
                }
            }
            pending = deferred;
        }
        Ok(())
    }
}
