// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! What a reactive function receives and what it returns.

use std::rc::Rc;

use serde_json::Value;

use crate::engine::{Message, Trip};
use crate::errors::{GraphError, GraphResult};

/// The aggregated values for one firing of a reactive function, in declaration order.
#[derive(Debug, Clone)]
pub struct Inputs {
    unit: String,
    channels: Rc<[String]>,
    values: Vec<Message>,
}

impl Inputs {
    pub fn new(unit: impl Into<String>, channels: Rc<[String]>, values: Vec<Message>) -> Self {
        Self {
            unit: unit.into(),
            channels,
            values,
        }
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[Message] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Message> {
        self.values
    }

    fn message(&self, index: usize) -> GraphResult<&Message> {
        self.values
            .get(index)
            .ok_or_else(|| self.failure(index, "has no value"))
    }

    fn failure(&self, index: usize, problem: &str) -> GraphError {
        let channel = self
            .channels
            .get(index)
            .map(String::as_str)
            .unwrap_or("<none>");
        GraphError::function_failed(
            &self.unit,
            format!("input {} ({}) {}", index, channel, problem),
        )
    }

    pub fn value(&self, index: usize) -> GraphResult<&Value> {
        self.message(index)?
            .as_value()
            .ok_or_else(|| self.failure(index, "is not a plain value"))
    }

    pub fn number(&self, index: usize) -> GraphResult<f64> {
        self.value(index)?
            .as_f64()
            .ok_or_else(|| self.failure(index, "is not a number"))
    }

    pub fn batch(&self, index: usize) -> GraphResult<&[Message]> {
        self.message(index)?
            .as_batch()
            .ok_or_else(|| self.failure(index, "is not a batch"))
    }

    /// Claim the trip carried by input `index`.
    pub fn trip(&self, index: usize) -> GraphResult<Trip> {
        let token = self
            .message(index)?
            .as_trip()
            .ok_or_else(|| self.failure(index, "is not a trip"))?;
        let channel = self
            .channels
            .get(index)
            .map(String::as_str)
            .unwrap_or(self.unit.as_str());
        token.take(channel)
    }
}

/// Named values a reactive function publishes, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outputs(Vec<(String, Message)>);

impl Outputs {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn one(channel: impl Into<String>, message: impl Into<Message>) -> Self {
        Self(vec![(channel.into(), message.into())])
    }

    pub fn with(mut self, channel: impl Into<String>, message: impl Into<Message>) -> Self {
        self.push(channel, message);
        self
    }

    pub fn push(&mut self, channel: impl Into<String>, message: impl Into<Message>) {
        self.0.push((channel.into(), message.into()));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(channel, _)| channel.as_str())
    }

    pub fn get(&self, channel: &str) -> Option<&Message> {
        self.0
            .iter()
            .find(|(name, _)| name == channel)
            .map(|(_, message)| message)
    }
}

impl IntoIterator for Outputs {
    type Item = (String, Message);
    type IntoIter = std::vec::IntoIter<(String, Message)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<S: Into<String>> FromIterator<(S, Message)> for Outputs {
    fn from_iter<I: IntoIterator<Item = (S, Message)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(channel, message)| (channel.into(), message))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inputs(values: Vec<Message>) -> Inputs {
        Inputs::new("square", Rc::from(vec!["number".to_string()]), values)
    }

    #[test]
    fn test_number_reports_channel_on_failure() {
        let err = inputs(vec![json!("five").into()]).number(0).unwrap_err();
        assert_eq!(
            err,
            GraphError::function_failed("square", "input 0 (number) is not a number")
        );
        assert_eq!(inputs(vec![json!(5).into()]).number(0).unwrap(), 5.0);
    }

    #[test]
    fn test_missing_input() {
        assert!(matches!(
            inputs(vec![]).value(0),
            Err(GraphError::FunctionFailed { .. })
        ));
    }

    #[test]
    fn test_trip_is_claimed_once() {
        let message = Message::from(Trip::new());
        let first = inputs(vec![message.clone()]);
        let second = inputs(vec![message]);
        assert!(first.trip(0).is_ok());
        assert_eq!(
            second.trip(0).unwrap_err(),
            GraphError::TripTaken {
                channel: "number".to_string()
            }
        );
    }

    #[test]
    fn test_outputs_keep_order() {
        let outputs = Outputs::one("b", json!(1)).with("a", json!(2));
        assert_eq!(outputs.channels().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(outputs.get("a"), Some(&Message::from(json!(2))));
        assert!(Outputs::none().is_empty());
    }
}
