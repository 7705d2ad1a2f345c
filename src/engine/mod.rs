// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The dataflow engine: channels, aggregation, units, networks and trips.

pub mod aggregate;
pub mod channel;
mod message;
pub mod network;
mod payload;
pub mod resolution;
pub mod trip;
pub mod unit;


pub use aggregate::{aggregate, Strategy};
pub use channel::{Channel, ChannelHandle, LinkedChannel, StoredChannel};
pub use message::{Message, TripToken};
pub use network::Network;
pub use payload::{Inputs, Outputs};
pub use resolution::{Resolution, UnitReference};
pub use trip::{Hop, RequestFn, RequestTap, TraceEntry, Trip, Unwrap};
pub use unit::{Lifecycle, Unit, WeakUnit};
