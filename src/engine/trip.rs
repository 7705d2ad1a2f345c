// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Trips: per-request routing tokens.
//!
//! A trip carries a LIFO stack of planned hops and a three-slot request state:
//!
//! * `trip` - the payload attached by whoever started the traversal
//! * `from` - the request of the hop currently being handled (its seed plus anything the
//!   previous hop merged into it)
//! * `to`   - the request of the hop that comes next; handlers merge their results here
//!
//! `next()` consumes the trip and forwards it by publishing it onto the target channel. The
//! handler that receives it takes ownership, reads and merges request state, and calls
//! `next()` again to continue, or drops it to end the traversal.

use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::engine::payload::Outputs;
use crate::engine::unit::{Unit, WeakUnit};
use crate::errors::{GraphError, GraphResult};
use crate::observability::messages::trip::{TripExhausted, TripForwarded};
use crate::observability::messages::StructuredLog;

/// Derives a value from a hop's request.
pub type RequestFn = Rc<dyn Fn(&Value) -> Value>;
/// Observes a hop's request.
pub type RequestTap = Rc<dyn Fn(&Value)>;

/// What a hop publishes on its target channel.
#[derive(Clone, Default)]
pub enum Unwrap {
    /// The trip itself; the receiving handler decides whether to continue.
    ///
    /// Only one subscriber can claim a forwarded trip. A stateful channel does not keep it
    /// as its replay value, but a multi-input function whose `Any` or `First` aggregation
    /// fires again with the same trip input gets `TripTaken`.
    #[default]
    Trip,
    /// The hop's request; the trip continues on its own afterwards.
    Request,
    /// A value derived from the hop's request; the trip continues on its own afterwards.
    With(RequestFn),
}

impl Unwrap {
    fn continues(&self) -> bool {
        !matches!(self, Unwrap::Trip)
    }
}

impl fmt::Debug for Unwrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unwrap::Trip => write!(f, "Trip"),
            Unwrap::Request => write!(f, "Request"),
            Unwrap::With(_) => write!(f, "With(..)"),
        }
    }
}

pub(crate) fn empty_request() -> Value {
    Value::Object(Map::new())
}

/// Shallow object merge: keys of `patch` overwrite keys of `target`.
pub(crate) fn merge_into(target: &mut Value, patch: Value) {
    match patch {
        Value::Object(entries) => {
            if !target.is_object() {
                *target = empty_request();
            }
            if let Value::Object(target) = target {
                target.extend(entries);
            }
        }
        Value::Null => {}
        other => *target = other,
    }
}

/// One planned step of a trip.
#[derive(Clone)]
pub struct Hop {
    target: Option<WeakUnit>,
    unit: String,
    channel: String,
    request: Value,
    unwrap: Unwrap,
    map: Option<RequestFn>,
    tap: Option<RequestTap>,
}

impl Hop {
    pub fn new(unit: &Unit, channel: impl Into<String>) -> Self {
        Self {
            target: Some(unit.downgrade()),
            unit: unit.name().to_string(),
            channel: channel.into(),
            request: empty_request(),
            unwrap: Unwrap::Trip,
            map: None,
            tap: None,
        }
    }

    /// A hop with no target. Forwarding to it publishes nothing.
    pub fn noop() -> Self {
        Self {
            target: None,
            unit: String::new(),
            channel: String::new(),
            request: empty_request(),
            unwrap: Unwrap::Trip,
            map: None,
            tap: None,
        }
    }

    pub fn with_request(mut self, request: Value) -> Self {
        self.request = if request.is_null() {
            empty_request()
        } else {
            request
        };
        self
    }

    pub fn with_unwrap(mut self, unwrap: Unwrap) -> Self {
        self.unwrap = unwrap;
        self
    }

    /// Replace the `from` slot with `f(request)` when this hop is visited.
    pub fn with_map(mut self, f: impl Fn(&Value) -> Value + 'static) -> Self {
        self.map = Some(Rc::new(f));
        self
    }

    pub fn with_tap(mut self, f: impl Fn(&Value) + 'static) -> Self {
        self.tap = Some(Rc::new(f));
        self
    }

    pub(crate) fn with_hooks(mut self, map: Option<RequestFn>, tap: Option<RequestTap>) -> Self {
        self.map = map;
        self.tap = tap;
        self
    }

    pub fn unit_name(&self) -> &str {
        &self.unit
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn request(&self) -> &Value {
        &self.request
    }

    pub fn is_noop(&self) -> bool {
        self.target.is_none()
    }
}

impl fmt::Debug for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hop")
            .field("unit", &self.unit)
            .field("channel", &self.channel)
            .field("request", &self.request)
            .field("unwrap", &self.unwrap)
            .finish()
    }
}

/// A visited `(unit, channel)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub unit: String,
    pub channel: String,
}

/// Routing token for one logical request.
///
/// A `Trip` is move-only: `next()` consumes it, and it reaches the next handler inside the
/// published message. Use [`Trip::copy`] to branch.
pub struct Trip {
    /// Top of the stack is the last element.
    stack: Vec<Hop>,
    attached: Value,
    from: Value,
    /// Stands in for `to` once no hop is left.
    scratch: Value,
    trace: Vec<TraceEntry>,
}

impl Trip {
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            attached: empty_request(),
            from: empty_request(),
            scratch: empty_request(),
            trace: Vec::new(),
        }
    }

    /// A trip that visits `hops` in the given order.
    pub fn with_hops(hops: impl IntoIterator<Item = Hop>) -> Self {
        let mut trip = Trip::new();
        trip.append(hops);
        trip
    }

    /// Set the `trip` slot of the request state.
    pub fn attach(&mut self, request: Value) {
        self.attached = if request.is_null() {
            empty_request()
        } else {
            request
        };
    }

    /// Push hops so they run before anything already planned, in the given order.
    pub fn append(&mut self, hops: impl IntoIterator<Item = Hop>) {
        let mut hops: Vec<Hop> = hops.into_iter().collect();
        hops.reverse();
        self.stack.extend(hops);
    }

    /// Pop the next hop and forward the trip to it.
    ///
    /// The popped hop's request becomes `from`; `to` becomes the request of the hop after it.
    /// An exhausted trip ends quietly.
    pub fn next(mut self) -> GraphResult<()> {
        let Some(hop) = self.stack.pop() else {
            TripExhausted {
                hops_visited: self.trace.len(),
            }
            .log();
            return Ok(());
        };
        if self.stack.is_empty() {
            self.scratch = empty_request();
        }

        let Hop {
            target,
            unit,
            channel,
            request,
            unwrap,
            map,
            tap,
        } = hop;

        if let Some(tap) = &tap {
            tap(&request);
        }
        self.from = match &map {
            Some(map) => map(&request),
            None => request.clone(),
        };

        let Some(target) = target else {
            return if unwrap.continues() { self.next() } else { Ok(()) };
        };
        let target = target.upgrade().ok_or_else(|| GraphError::InvalidUnit {
            unit: unit.clone(),
            context: format!("unit dropped before trip reached channel {}", channel),
        })?;

        self.trace.push(TraceEntry {
            unit: unit.clone(),
            channel: channel.clone(),
        });
        TripForwarded {
            unit: &unit,
            channel: &channel,
            remaining: self.stack.len(),
        }
        .log();

        match unwrap {
            Unwrap::Trip => target.publish(Outputs::one(channel, self)),
            Unwrap::Request => {
                target.publish(Outputs::one(channel, request))?;
                self.next()
            }
            Unwrap::With(f) => {
                target.publish(Outputs::one(channel, f(&request)))?;
                self.next()
            }
        }
    }

    /// A new trip over the remaining hops with independent request snapshots.
    ///
    /// The attached payload is carried over; `from` and the trace start fresh.
    pub fn copy(&self) -> Trip {
        Trip {
            stack: self.stack.clone(),
            attached: self.attached.clone(),
            from: empty_request(),
            scratch: empty_request(),
            trace: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.stack.len()
    }

    /// The hop `next()` will visit.
    pub fn upcoming(&self) -> Option<&Hop> {
        self.stack.last()
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// The `trip` slot.
    pub fn attached(&self) -> &Value {
        &self.attached
    }

    pub fn from(&self) -> &Value {
        &self.from
    }

    pub fn to(&self) -> &Value {
        self.stack
            .last()
            .map(|hop| &hop.request)
            .unwrap_or(&self.scratch)
    }

    pub fn to_mut(&mut self) -> &mut Value {
        match self.stack.last_mut() {
            Some(hop) => &mut hop.request,
            None => &mut self.scratch,
        }
    }

    /// Merge `patch` into the `to` slot.
    pub fn merge_to(&mut self, patch: Value) {
        merge_into(self.to_mut(), patch);
    }

    /// Look `key` up in `from`, falling back to the attached payload.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        self.from.get(key).or_else(|| self.attached.get(key))
    }
}

impl Default for Trip {
    fn default() -> Self {
        Trip::new()
    }
}

impl fmt::Debug for Trip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trip")
            .field("remaining", &self.stack.len())
            .field("trip", &self.attached)
            .field("from", &self.from)
            .field("to", self.to())
            .field("trace", &self.trace)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FunctionConfig, UnitConfig};
    use crate::engine::Message;
    use serde_json::json;
    use std::cell::RefCell;

    /// A unit whose channels `c1..c3` record the `name` found in `from` and pass the trip on.
    fn relay(visits: Rc<RefCell<Vec<String>>>) -> Unit {
        let mut config = UnitConfig::new("relay");
        for channel in ["c1", "c2", "c3"] {
            let visits = Rc::clone(&visits);
            config = config.channel(channel, Default::default()).function(FunctionConfig::new(
                &[channel],
                move |_, inputs| {
                    let trip = inputs.trip(0)?;
                    let name = trip.from()["name"].as_str().unwrap_or("?").to_string();
                    visits.borrow_mut().push(name);
                    trip.next()?;
                    Ok(Outputs::none())
                },
            ));
        }
        let unit = Unit::new(config).unwrap();
        unit.start().unwrap();
        unit
    }

    fn named(unit: &Unit, channel: &str, name: &str) -> Hop {
        Hop::new(unit, channel).with_request(json!({ "name": name }))
    }

    #[test]
    fn test_append_is_visited_before_earlier_hops() {
        let visits = Rc::new(RefCell::new(Vec::new()));
        let unit = relay(Rc::clone(&visits));

        let mut trip = Trip::with_hops([named(&unit, "c3", "planned")]);
        trip.attach(json!({ "type": "preappend" }));
        trip.append([named(&unit, "c1", "x"), named(&unit, "c2", "y")]);
        trip.next().unwrap();

        assert_eq!(*visits.borrow(), vec!["x", "y", "planned"]);
    }

    #[test]
    fn test_next_moves_to_into_from() {
        let unit = Unit::new(UnitConfig::new("sink").channel("in", Default::default())).unwrap();
        let seen: Rc<RefCell<Vec<Trip>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _s = unit
            .subscribe("in", move |m: Message| {
                sink.borrow_mut().push(m.as_trip().unwrap().take("in")?);
                Ok(())
            })
            .unwrap();

        let mut trip = Trip::with_hops([
            Hop::new(&unit, "in"),
            Hop::new(&unit, "in").with_request(json!({ "factor": 5 })),
        ]);
        assert_eq!(trip.to(), &json!({}));
        trip.merge_to(json!({ "input": 5 }));
        trip.next().unwrap();

        let mut trip = seen.borrow_mut().pop().unwrap();
        assert_eq!(trip.from(), &json!({ "input": 5 }));
        assert_eq!(trip.to(), &json!({ "factor": 5 }));

        trip.merge_to(json!({ "input": 25 }));
        trip.next().unwrap();
        let trip = seen.borrow_mut().pop().unwrap();
        assert_eq!(trip.from(), &json!({ "factor": 5, "input": 25 }));
        assert!(trip.is_empty());
        assert_eq!(trip.trace().len(), 2);
    }

    #[test]
    fn test_copy_snapshots_requests() {
        let unit = Unit::new(UnitConfig::new("u").channel("c", Default::default())).unwrap();
        let mut original = Trip::with_hops([Hop::new(&unit, "c").with_request(json!({ "n": 1 }))]);
        let mut branch = original.copy();

        branch.merge_to(json!({ "n": 2 }));
        original.merge_to(json!({ "m": 3 }));

        assert_eq!(original.to(), &json!({ "n": 1, "m": 3 }));
        assert_eq!(branch.to(), &json!({ "n": 2 }));
        assert_eq!(branch.remaining(), original.remaining());
    }

    #[test]
    fn test_unwrap_publishes_request_and_continues() {
        let unit = Unit::new(
            UnitConfig::new("u")
                .channel("values", Default::default())
                .channel("done", Default::default()),
        )
        .unwrap();
        let values = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&values);
        let _v = unit
            .subscribe("values", move |m: Message| {
                sink.borrow_mut().push(m);
                Ok(())
            })
            .unwrap();
        let finished = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&finished);
        let _d = unit
            .subscribe("done", move |m: Message| {
                *flag.borrow_mut() = m.is_trip();
                Ok(())
            })
            .unwrap();

        let trip = Trip::with_hops([
            Hop::new(&unit, "values")
                .with_request(json!({ "n": 1 }))
                .with_unwrap(Unwrap::Request),
            Hop::new(&unit, "values")
                .with_request(json!({ "n": 2 }))
                .with_unwrap(Unwrap::With(Rc::new(|r| r["n"].clone()))),
            Hop::new(&unit, "done"),
        ]);
        trip.next().unwrap();

        assert_eq!(
            *values.borrow(),
            vec![Message::from(json!({ "n": 1 })), Message::from(json!(2))]
        );
        assert!(*finished.borrow());
    }

    #[test]
    fn test_map_and_tap_see_hop_request() {
        let unit = Unit::new(UnitConfig::new("u").channel("c", Default::default())).unwrap();
        let tapped = Rc::new(RefCell::new(Value::Null));
        let tap_sink = Rc::clone(&tapped);
        let from = Rc::new(RefCell::new(Value::Null));
        let from_sink = Rc::clone(&from);
        let _s = unit
            .subscribe("c", move |m: Message| {
                let trip = m.as_trip().unwrap().take("c")?;
                *from_sink.borrow_mut() = trip.from().clone();
                Ok(())
            })
            .unwrap();

        Trip::with_hops([Hop::new(&unit, "c")
            .with_request(json!({ "n": 2 }))
            .with_tap(move |r| *tap_sink.borrow_mut() = r.clone())
            .with_map(|r| json!({ "n": r["n"].as_i64().unwrap_or(0) * 10 }))])
        .next()
        .unwrap();

        assert_eq!(*tapped.borrow(), json!({ "n": 2 }));
        assert_eq!(*from.borrow(), json!({ "n": 20 }));
    }

    #[test]
    fn test_exhausted_and_noop_trips_end_quietly() {
        assert!(Trip::new().next().is_ok());
        assert!(Trip::with_hops([Hop::noop()]).next().is_ok());
    }

    #[test]
    fn test_dropped_target_is_invalid_unit() {
        let unit = Unit::new(UnitConfig::new("gone").channel("c", Default::default())).unwrap();
        let trip = Trip::with_hops([Hop::new(&unit, "c")]);
        drop(unit);
        assert!(matches!(trip.next(), Err(GraphError::InvalidUnit { .. })));
    }

    #[test]
    fn test_lookup_falls_back_to_attached() {
        let mut trip = Trip::new();
        trip.attach(json!({ "input": 5 }));
        assert_eq!(trip.lookup("input"), Some(&json!(5)));
        assert_eq!(trip.lookup("missing"), None);
    }
}
