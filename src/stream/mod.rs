// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Synchronous push streams.
//!
//! The engine needs hot, multicast endpoints whose `next` drives every subscriber before it
//! returns, so that a unit publishing from inside a reactive function recurses on the same
//! turn. This module provides the small set of pieces that makes that work:
//!
//! * [`Subject`] - a hot multicast endpoint, optionally replaying its last value
//! * [`Stream`] - a cold, composable description of "how to subscribe"
//! * [`Subscription`] - an explicit handle that detaches handlers when unsubscribed
//!
//! Operator state (buffers, counters) lives inside the subscribe closure, so every
//! subscription of a derived stream gets its own copy.

pub mod stages;

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::errors::{GraphError, GraphResult};

/// A subscriber callback. Errors travel back to whoever pushed the value.
pub type Handler<T> = Rc<dyn Fn(T) -> GraphResult<()>>;

/// Handle to one or more attached handlers.
///
/// Dropping a `Subscription` leaves the handlers attached; call [`Subscription::unsubscribe`]
/// to detach them.
#[must_use = "dropping a Subscription does not detach its handlers"]
pub struct Subscription {
    teardowns: Vec<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn empty() -> Self {
        Self {
            teardowns: Vec::new(),
        }
    }

    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardowns: vec![Box::new(teardown)],
        }
    }

    /// Fold another subscription into this one so both detach together.
    pub fn add(&mut self, other: Subscription) {
        self.teardowns.extend(other.teardowns);
    }

    pub fn unsubscribe(self) {
        for teardown in self.teardowns {
            teardown();
        }
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("teardowns", &self.teardowns.len())
            .finish()
    }
}

struct SubjectState<T> {
    handlers: Vec<(u64, Handler<T>)>,
    next_id: u64,
    stateful: bool,
    last: Option<T>,
    closed: bool,
    /// Named in the error raised when subscribing to a closed subject.
    owner: String,
}

/// Hot multicast endpoint.
///
/// A stateful subject remembers the most recent value (or its initial value) and replays it
/// to each new subscriber at subscription time.
pub struct Subject<T> {
    state: Rc<RefCell<SubjectState<T>>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: Clone + 'static> Subject<T> {
    pub fn new() -> Self {
        Self::with_state(false, None)
    }

    /// A subject that replays its last value; `initial` seeds it before anything is published.
    pub fn stateful(initial: Option<T>) -> Self {
        Self::with_state(true, initial)
    }

    fn with_state(stateful: bool, last: Option<T>) -> Self {
        Self {
            state: Rc::new(RefCell::new(SubjectState {
                handlers: Vec::new(),
                next_id: 0,
                stateful,
                last,
                closed: false,
                owner: String::new(),
            })),
        }
    }

    /// Name the unit owning this subject.
    pub fn owned_by(self, owner: impl Into<String>) -> Self {
        self.state.borrow_mut().owner = owner.into();
        self
    }

    pub fn is_stateful(&self) -> bool {
        self.state.borrow().stateful
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }

    pub fn last(&self) -> Option<T> {
        self.state.borrow().last.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().handlers.len()
    }

    /// Push `value` to every current subscriber, in subscription order.
    ///
    /// Handlers run against a snapshot of the subscriber list, so a handler may subscribe,
    /// unsubscribe or publish again without invalidating the iteration. The first handler
    /// error stops delivery and is returned. A closed subject drops the value.
    pub fn next(&self, value: T) -> GraphResult<()> {
        self.deliver(value, true)
    }

    /// Like [`Subject::next`], but a stateful subject keeps its previous replay value.
    pub fn next_transient(&self, value: T) -> GraphResult<()> {
        self.deliver(value, false)
    }

    fn deliver(&self, value: T, remember: bool) -> GraphResult<()> {
        let handlers: Vec<Handler<T>> = {
            let mut state = self.state.borrow_mut();
            if state.closed {
                return Ok(());
            }
            if state.stateful && remember {
                state.last = Some(value.clone());
            }
            state.handlers.iter().map(|(_, h)| Rc::clone(h)).collect()
        };

        for handler in handlers {
            handler(value.clone())?;
        }
        Ok(())
    }

    pub fn subscribe(&self, handler: Handler<T>) -> GraphResult<Subscription> {
        let (id, replay) = {
            let mut state = self.state.borrow_mut();
            if state.closed {
                return Err(GraphError::stopped_unit(state.owner.clone()));
            }
            let id = state.next_id;
            state.next_id += 1;
            state.handlers.push((id, Rc::clone(&handler)));
            (id, state.last.clone())
        };

        let weak: Weak<RefCell<SubjectState<T>>> = Rc::downgrade(&self.state);
        let subscription = Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().handlers.retain(|(i, _)| *i != id);
            }
        });

        if let Some(value) = replay {
            if let Err(e) = handler(value) {
                subscription.unsubscribe();
                return Err(e);
            }
        }
        Ok(subscription)
    }

    /// Drop every subscriber and stop accepting values until [`Subject::reopen`].
    ///
    /// Subscribing to a closed subject fails with `InvalidUnit`.
    pub fn close(&self) {
        let mut state = self.state.borrow_mut();
        state.closed = true;
        state.handlers.clear();
    }

    pub fn reopen(&self) {
        self.state.borrow_mut().closed = false;
    }

    pub fn stream(&self) -> Stream<T> {
        let subject = self.clone();
        Stream::new(move |handler| subject.subscribe(handler))
    }
}

impl<T: Clone + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cold stream: a recipe for attaching a handler to some upstream source.
pub struct Stream<T> {
    source: Rc<dyn Fn(Handler<T>) -> GraphResult<Subscription>>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            source: Rc::clone(&self.source),
        }
    }
}

impl<T: Clone + 'static> Stream<T> {
    pub fn new(source: impl Fn(Handler<T>) -> GraphResult<Subscription> + 'static) -> Self {
        Self {
            source: Rc::new(source),
        }
    }

    /// A stream whose every subscription attempt fails with `error`.
    pub fn failing(error: GraphError) -> Self {
        Stream::new(move |_| Err(error.clone()))
    }

    pub fn subscribe(
        &self,
        handler: impl Fn(T) -> GraphResult<()> + 'static,
    ) -> GraphResult<Subscription> {
        (self.source)(Rc::new(handler))
    }

    pub fn subscribe_with(&self, handler: Handler<T>) -> GraphResult<Subscription> {
        (self.source)(handler)
    }

    pub fn map<U: Clone + 'static>(&self, f: impl Fn(T) -> U + 'static) -> Stream<U> {
        let upstream = self.clone();
        let f = Rc::new(f);
        Stream::new(move |downstream: Handler<U>| {
            let f = Rc::clone(&f);
            upstream.subscribe(move |value| downstream(f(value)))
        })
    }

    pub fn filter(&self, predicate: impl Fn(&T) -> bool + 'static) -> Stream<T> {
        let upstream = self.clone();
        let predicate = Rc::new(predicate);
        Stream::new(move |downstream: Handler<T>| {
            let predicate = Rc::clone(&predicate);
            upstream.subscribe(move |value| {
                if predicate(&value) {
                    downstream(value)
                } else {
                    Ok(())
                }
            })
        })
    }

    pub fn tap(&self, observer: impl Fn(&T) + 'static) -> Stream<T> {
        let upstream = self.clone();
        let observer = Rc::new(observer);
        Stream::new(move |downstream: Handler<T>| {
            let observer = Rc::clone(&observer);
            upstream.subscribe(move |value| {
                observer(&value);
                downstream(value)
            })
        })
    }

    /// Forward only the first `count` values of each subscription.
    pub fn take(&self, count: usize) -> Stream<T> {
        let upstream = self.clone();
        Stream::new(move |downstream: Handler<T>| {
            let seen = Rc::new(RefCell::new(0usize));
            upstream.subscribe(move |value| {
                let pass = {
                    let mut seen = seen.borrow_mut();
                    *seen += 1;
                    *seen <= count
                };
                if pass {
                    downstream(value)
                } else {
                    Ok(())
                }
            })
        })
    }

    /// Drop the first `count` values of each subscription.
    pub fn skip(&self, count: usize) -> Stream<T> {
        let upstream = self.clone();
        Stream::new(move |downstream: Handler<T>| {
            let seen = Rc::new(RefCell::new(0usize));
            upstream.subscribe(move |value| {
                let pass = {
                    let mut seen = seen.borrow_mut();
                    *seen += 1;
                    *seen > count
                };
                if pass {
                    downstream(value)
                } else {
                    Ok(())
                }
            })
        })
    }

    /// Group values into consecutive, non-overlapping batches of `size`.
    ///
    /// A `size` of zero is treated as one; [`stages::buffer_count`] rejects it instead.
    pub fn buffer_count(&self, size: usize) -> Stream<Vec<T>> {
        let size = size.max(1);
        let upstream = self.clone();
        Stream::new(move |downstream: Handler<Vec<T>>| {
            let buffer: Rc<RefCell<Vec<T>>> = Rc::new(RefCell::new(Vec::with_capacity(size)));
            upstream.subscribe(move |value| {
                let full = {
                    let mut buffer = buffer.borrow_mut();
                    buffer.push(value);
                    if buffer.len() == size {
                        Some(std::mem::take(&mut *buffer))
                    } else {
                        None
                    }
                };
                match full {
                    Some(batch) => downstream(batch),
                    None => Ok(()),
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector<T: Clone + 'static>() -> (Rc<RefCell<Vec<T>>>, impl Fn(T) -> GraphResult<()>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |v: T| {
            sink.borrow_mut().push(v);
            Ok(())
        })
    }

    #[test]
    fn test_subject_delivers_in_subscription_order() {
        let subject: Subject<i32> = Subject::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let first = Rc::clone(&order);
        let _a = subject
            .subscribe(Rc::new(move |v: i32| {
                first.borrow_mut().push(("a", v));
                Ok(())
            }))
            .unwrap();
        let second = Rc::clone(&order);
        let _b = subject
            .subscribe(Rc::new(move |v: i32| {
                second.borrow_mut().push(("b", v));
                Ok(())
            }))
            .unwrap();

        subject.next(1).unwrap();
        assert_eq!(*order.borrow(), vec![("a", 1), ("b", 1)]);
    }

    #[test]
    fn test_plain_subject_does_not_replay() {
        let subject: Subject<i32> = Subject::new();
        subject.next(7).unwrap();

        let (seen, sink) = collector();
        let _s = subject.stream().subscribe(sink).unwrap();
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_stateful_subject_replays_last_value() {
        let subject = Subject::stateful(Some(1));
        subject.next(2).unwrap();

        let (seen, sink) = collector();
        let _s = subject.stream().subscribe(sink).unwrap();
        subject.next(3).unwrap();
        assert_eq!(*seen.borrow(), vec![2, 3]);
    }

    #[test]
    fn test_transient_value_is_not_replayed() {
        let subject = Subject::stateful(Some(1));
        subject.next_transient(2).unwrap();

        let (seen, sink) = collector();
        let _s = subject.stream().subscribe(sink).unwrap();
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn test_unsubscribe_detaches_handler() {
        let subject: Subject<i32> = Subject::new();
        let (seen, sink) = collector();
        let subscription = subject.stream().subscribe(sink).unwrap();

        subject.next(1).unwrap();
        subscription.unsubscribe();
        subject.next(2).unwrap();

        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn test_closed_subject_drops_everything() {
        let subject: Subject<i32> = Subject::new();
        let (seen, sink) = collector();
        let _s = subject.stream().subscribe(sink).unwrap();

        subject.close();
        subject.next(1).unwrap();
        assert!(seen.borrow().is_empty());
        assert!(subject.is_closed());
    }

    #[test]
    fn test_subscribing_to_closed_subject_fails() {
        let subject: Subject<i32> = Subject::new().owned_by("square");
        subject.close();

        let err = subject.stream().subscribe(|_| Ok(())).unwrap_err();
        assert_eq!(err, GraphError::stopped_unit("square"));

        subject.reopen();
        let (seen, sink) = collector();
        let _s = subject.stream().subscribe(sink).unwrap();
        subject.next(1).unwrap();
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn test_handler_error_stops_delivery() {
        let subject: Subject<i32> = Subject::new();
        let _failing = subject
            .subscribe(Rc::new(|_: i32| Err(GraphError::invalid_channel("u", "c"))))
            .unwrap();
        let (seen, sink) = collector();
        let _s = subject.stream().subscribe(sink).unwrap();

        assert!(subject.next(1).is_err());
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_buffer_count_state_is_per_subscription() {
        let subject: Subject<i32> = Subject::new();
        let batches = subject.stream().buffer_count(2);

        let (first, sink) = collector();
        let _a = batches.subscribe(sink).unwrap();
        subject.next(1).unwrap();

        let (second, sink) = collector();
        let _b = batches.subscribe(sink).unwrap();
        subject.next(2).unwrap();
        subject.next(3).unwrap();

        assert_eq!(*first.borrow(), vec![vec![1, 2]]);
        assert_eq!(*second.borrow(), vec![vec![2, 3]]);
    }

    #[test]
    fn test_take_and_skip() {
        let subject: Subject<i32> = Subject::new();
        let (taken, sink) = collector();
        let _t = subject.stream().take(2).subscribe(sink).unwrap();
        let (skipped, sink) = collector();
        let _s = subject.stream().skip(2).subscribe(sink).unwrap();

        for v in 1..=4 {
            subject.next(v).unwrap();
        }
        assert_eq!(*taken.borrow(), vec![1, 2]);
        assert_eq!(*skipped.borrow(), vec![3, 4]);
    }

    #[test]
    fn test_failing_stream_errors_on_subscribe() {
        let stream: Stream<i32> = Stream::failing(GraphError::InvalidPipe {
            channel: "c".into(),
            index: 0,
        });
        assert!(matches!(
            stream.subscribe(|_| Ok(())),
            Err(GraphError::InvalidPipe { index: 0, .. })
        ));
    }
}
