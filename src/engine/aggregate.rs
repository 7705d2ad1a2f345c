// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Input aggregation: turning N input channels into one combined stream.
//!
//! Every strategy emits `Vec<Message>` ordered like the declared input channels, so a
//! reactive function always sees its inputs positionally.
//!
//! | strategy | fires when                                   | combination   |
//! |----------|----------------------------------------------|---------------|
//! | `First`  | the first-declared channel emits             | latest values |
//! | `Any`    | any channel emits, once all have emitted     | latest values |
//! | `All`    | every channel has an unconsumed value        | index-aligned |
//!
//! With a single input all three degenerate to a plain subscription.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::str::FromStr;

use serde::Deserialize;

use crate::engine::{Message, Unit};
use crate::errors::GraphResult;
use crate::observability::messages::{unit::UnknownStrategy, StructuredLog};
use crate::stream::{Handler, Stream, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// React to a trigger channel, treating the others as side parameters.
    #[default]
    First,
    /// Latest-value combination across all channels.
    #[serde(alias = "anylatest")]
    Any,
    /// Strict pairing by arrival order.
    All,
}

type AggregateFn = fn(Vec<Stream<Message>>) -> Stream<Vec<Message>>;

const AGGREGATES: [(Strategy, AggregateFn); 3] = [
    (Strategy::First, first),
    (Strategy::Any, any),
    (Strategy::All, all),
];

impl Strategy {
    /// Parse a strategy tag, falling back to `First` for unknown tags.
    pub fn from_tag(tag: &str) -> Self {
        tag.parse().unwrap_or_else(|_| {
            UnknownStrategy { tag }.log();
            Strategy::First
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::First => "first",
            Strategy::Any => "any",
            Strategy::All => "all",
        }
    }

    fn aggregate_fn(self) -> AggregateFn {
        AGGREGATES
            .iter()
            .find(|(strategy, _)| *strategy == self)
            .map(|(_, f)| *f)
            .unwrap_or(first)
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Strategy::First),
            "any" | "anylatest" => Ok(Strategy::Any),
            "all" => Ok(Strategy::All),
            other => Err(format!("unknown aggregation strategy '{}'", other)),
        }
    }
}

/// Build the combined input stream for a function of `unit`.
///
/// Every channel name is resolved before anything subscribes, so an undeclared input fails
/// with `InvalidChannel` without leaving partial subscriptions behind.
pub fn aggregate(
    unit: &Unit,
    strategy: Strategy,
    channels: &[String],
) -> GraphResult<Stream<Vec<Message>>> {
    let streams = channels
        .iter()
        .map(|name| unit.get(name).stream())
        .collect::<GraphResult<Vec<_>>>()?;

    if streams.len() < 2 {
        return Ok(single(streams));
    }
    Ok((strategy.aggregate_fn())(streams))
}

/// Plain subscription for one input; a function without inputs never fires.
fn single(streams: Vec<Stream<Message>>) -> Stream<Vec<Message>> {
    match streams.into_iter().next() {
        Some(stream) => stream.map(|message| vec![message]),
        None => Stream::new(|_| Ok(Subscription::empty())),
    }
}

/// Subscribe `handlers` to `streams` in order, undoing everything if one subscription fails.
fn subscribe_all(
    streams: &[Stream<Message>],
    mut handler_for: impl FnMut(usize) -> Handler<Message>,
) -> GraphResult<Subscription> {
    let mut subscription = Subscription::empty();
    for (index, stream) in streams.iter().enumerate() {
        match stream.subscribe_with(handler_for(index)) {
            Ok(s) => subscription.add(s),
            Err(e) => {
                subscription.unsubscribe();
                return Err(e);
            }
        }
    }
    Ok(subscription)
}

struct FirstState {
    latest: Vec<Option<Message>>,
    /// Trigger values that arrived before every side channel emitted. `None` once the
    /// barrier has been released.
    pending: Option<Vec<Message>>,
}

impl FirstState {
    fn combine(&self, trigger: Message) -> Option<Vec<Message>> {
        let mut combined = Vec::with_capacity(self.latest.len() + 1);
        combined.push(trigger);
        for value in &self.latest {
            combined.push(value.clone()?);
        }
        Some(combined)
    }

    /// Release the barrier once all side channels have a value.
    fn release(&mut self) -> Vec<Vec<Message>> {
        if self.latest.iter().any(Option::is_none) {
            return Vec::new();
        }
        match self.pending.take() {
            Some(buffered) => buffered
                .into_iter()
                .filter_map(|trigger| self.combine(trigger))
                .collect(),
            None => Vec::new(),
        }
    }
}

fn first(mut streams: Vec<Stream<Message>>) -> Stream<Vec<Message>> {
    if streams.len() < 2 {
        return single(streams);
    }
    let trigger = streams.remove(0);
    let rest = streams;

    Stream::new(move |downstream: Handler<Vec<Message>>| {
        let state = Rc::new(RefCell::new(FirstState {
            latest: vec![None; rest.len()],
            pending: Some(Vec::new()),
        }));

        // Side channels first, so values they replay on subscription are already known
        // when the trigger replays its own.
        let mut subscription = subscribe_all(&rest, |index| {
            let state = Rc::clone(&state);
            let downstream = Rc::clone(&downstream);
            let handler: Handler<Message> = Rc::new(move |message: Message| {
                let released = {
                    let mut state = state.borrow_mut();
                    state.latest[index] = Some(message);
                    state.release()
                };
                for combined in released {
                    downstream(combined)?;
                }
                Ok(())
            });
            handler
        })?;

        let trigger_state = Rc::clone(&state);
        let trigger_downstream = Rc::clone(&downstream);
        let on_trigger = trigger.subscribe(move |message| {
            let combined = {
                let mut state = trigger_state.borrow_mut();
                match state.pending.as_mut() {
                    Some(buffered) => {
                        buffered.push(message);
                        None
                    }
                    None => state.combine(message),
                }
            };
            match combined {
                Some(combined) => trigger_downstream(combined),
                None => Ok(()),
            }
        });

        match on_trigger {
            Ok(s) => {
                subscription.add(s);
                Ok(subscription)
            }
            Err(e) => {
                subscription.unsubscribe();
                Err(e)
            }
        }
    })
}

fn any(streams: Vec<Stream<Message>>) -> Stream<Vec<Message>> {
    if streams.len() < 2 {
        return single(streams);
    }
    Stream::new(move |downstream: Handler<Vec<Message>>| {
        let latest: Rc<RefCell<Vec<Option<Message>>>> =
            Rc::new(RefCell::new(vec![None; streams.len()]));

        subscribe_all(&streams, |index| {
            let latest = Rc::clone(&latest);
            let downstream = Rc::clone(&downstream);
            let handler: Handler<Message> = Rc::new(move |message: Message| {
                let combined = {
                    let mut latest = latest.borrow_mut();
                    latest[index] = Some(message);
                    latest.iter().cloned().collect::<Option<Vec<_>>>()
                };
                match combined {
                    Some(combined) => downstream(combined),
                    None => Ok(()),
                }
            });
            handler
        })
    })
}

fn all(streams: Vec<Stream<Message>>) -> Stream<Vec<Message>> {
    if streams.len() < 2 {
        return single(streams);
    }
    Stream::new(move |downstream: Handler<Vec<Message>>| {
        let queues: Rc<RefCell<Vec<VecDeque<Message>>>> =
            Rc::new(RefCell::new(vec![VecDeque::new(); streams.len()]));

        subscribe_all(&streams, |index| {
            let queues = Rc::clone(&queues);
            let downstream = Rc::clone(&downstream);
            let handler: Handler<Message> = Rc::new(move |message: Message| {
                let zipped = {
                    let mut queues = queues.borrow_mut();
                    queues[index].push_back(message);
                    if queues.iter().all(|q| !q.is_empty()) {
                        queues
                            .iter_mut()
                            .map(|q| q.pop_front())
                            .collect::<Option<Vec<_>>>()
                    } else {
                        None
                    }
                };
                match zipped {
                    Some(zipped) => downstream(zipped),
                    None => Ok(()),
                }
            });
            handler
        })
    })
}
