// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::engine::trip::Trip;
use crate::errors::{GraphError, GraphResult};

/// A value travelling through a channel.
///
/// Channels multicast, so a message is cloned once per subscriber. Plain data is a JSON
/// value; batches come out of buffering stages; trips travel inside a [`TripToken`] so that
/// exactly one subscriber can claim the trip and continue its traversal.
#[derive(Clone)]
pub enum Message {
    Value(Value),
    Batch(Vec<Message>),
    Trip(TripToken),
}

impl Message {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Message::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_value().and_then(Value::as_f64)
    }

    pub fn as_batch(&self) -> Option<&[Message]> {
        match self {
            Message::Batch(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_trip(&self) -> Option<&TripToken> {
        match self {
            Message::Trip(token) => Some(token),
            _ => None,
        }
    }

    pub fn is_trip(&self) -> bool {
        matches!(self, Message::Trip(_))
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Value(v) => write!(f, "Value({})", v),
            Message::Batch(items) => f.debug_tuple("Batch").field(items).finish(),
            Message::Trip(token) => token.fmt(f),
        }
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Message::Value(a), Message::Value(b)) => a == b,
            (Message::Batch(a), Message::Batch(b)) => a == b,
            (Message::Trip(a), Message::Trip(b)) => Rc::ptr_eq(&a.slot, &b.slot),
            _ => false,
        }
    }
}

impl From<Value> for Message {
    fn from(value: Value) -> Self {
        Message::Value(value)
    }
}

impl From<Vec<Message>> for Message {
    fn from(items: Vec<Message>) -> Self {
        Message::Batch(items)
    }
}

impl From<Trip> for Message {
    fn from(trip: Trip) -> Self {
        Message::Trip(TripToken::new(trip))
    }
}

/// Shared slot holding a forwarded trip until one subscriber takes it.
#[derive(Clone)]
pub struct TripToken {
    slot: Rc<RefCell<Option<Trip>>>,
}

impl TripToken {
    pub fn new(trip: Trip) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Some(trip))),
        }
    }

    /// Move the trip out; later calls fail with [`GraphError::TripTaken`].
    pub fn take(&self, channel: &str) -> GraphResult<Trip> {
        self.slot
            .borrow_mut()
            .take()
            .ok_or_else(|| GraphError::TripTaken {
                channel: channel.to_string(),
            })
    }

    /// Read the trip without claiming it. `None` once it has been taken.
    pub fn peek<R>(&self, f: impl FnOnce(&Trip) -> R) -> Option<R> {
        self.slot.borrow().as_ref().map(f)
    }

    pub fn is_taken(&self) -> bool {
        self.slot.borrow().is_none()
    }
}

impl fmt::Debug for TripToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot.try_borrow() {
            Ok(slot) => match slot.as_ref() {
                Some(trip) => write!(f, "Trip(remaining={})", trip.remaining()),
                None => write!(f, "Trip(taken)"),
            },
            Err(_) => write!(f, "Trip(busy)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trip_token_can_be_taken_once() {
        let message = Message::from(Trip::new());
        let copy = message.clone();

        assert!(message.as_trip().unwrap().take("c1").is_ok());
        assert_eq!(
            copy.as_trip().unwrap().take("c1").unwrap_err(),
            GraphError::TripTaken {
                channel: "c1".to_string()
            }
        );
    }

    #[test]
    fn test_peek_before_take() {
        let message = Message::from(Trip::new());
        let Message::Trip(token) = &message else {
            panic!("expected trip");
        };
        assert_eq!(token.peek(|t| t.remaining()), Some(0));
        let _ = token.take("c");
        assert_eq!(token.peek(|t| t.remaining()), None);
        assert!(token.is_taken());
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(Message::from(json!(25)), Message::from(json!(25)));
        assert_ne!(Message::from(json!(25)), Message::from(json!(26)));
        assert_eq!(Message::from(json!(2.5)).as_f64(), Some(2.5));
    }
}
