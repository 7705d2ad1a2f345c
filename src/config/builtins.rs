// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Builtin functions and stages.
//!
//! Functions:
//! - `square`, `double` - publish the transformed number on `output`
//! - `sum_batch`, `product_batch` - fold a batch of numbers and publish on `output`
//! - `hop_square`, `hop_scale` - trip handlers that rewrite `input` in the next request
//! - `dispatch_route` - start a trip over the route named in an `{input, route}` request
//! - `collect_result` - end a trip and publish its `input` on `output`
//!
//! Stages: `buffer_count`, `take`, `skip` (all take a count as `value`) and `trace` (an
//! optional label as `value`).
//!
//! Arithmetic stays integral while both operands are integers and falls back to floats.

use std::rc::Rc;

use serde_json::{json, Map, Number, Value};

use crate::config::consts::{
    ANSWERS_CHANNEL, DOUBLES_CHANNEL, FACTOR_KEY, INPUT_KEY, PRODUCT_CHANNEL, ROUTE_KEY,
    SQUARES_CHANNEL, SUM_CHANNEL,
};
use crate::config::graph::Transform;
use crate::config::registry::Registry;
use crate::engine::{Inputs, Message, Outputs, Trip, Unit};
use crate::errors::{GraphError, GraphResult};
use crate::observability::messages::config::StageObserved;
use crate::observability::messages::StructuredLog;
use crate::stream::stages;

pub(crate) fn register(registry: &mut Registry) {
    registry
        .register_factory("square", |output| {
            unary(output.unwrap_or(SQUARES_CHANNEL), |n| product(n, n))
        })
        .register_factory("double", |output| {
            unary(output.unwrap_or(DOUBLES_CHANNEL), |n| product(n, &json!(2)))
        })
        .register_factory("sum_batch", |output| {
            fold(output.unwrap_or(SUM_CHANNEL), json!(0), sum)
        })
        .register_factory("product_batch", |output| {
            fold(output.unwrap_or(PRODUCT_CHANNEL), json!(1), product)
        })
        .register_function("hop_square", hop_square)
        .register_function("hop_scale", hop_scale)
        .register_function("dispatch_route", dispatch_route)
        .register_factory("collect_result", |output| {
            collect_result(output.unwrap_or(ANSWERS_CHANNEL))
        });

    registry
        .register_stage("buffer_count", |value| {
            count(value).and_then(stages::buffer_count)
        })
        .register_stage("take", |value| count(value).map(stages::take))
        .register_stage("skip", |value| count(value).map(stages::skip))
        .register_stage("trace", |value| {
            let label = value
                .and_then(Value::as_str)
                .unwrap_or("trace")
                .to_string();
            Some(stages::tap(move |message: &Message| {
                StageObserved {
                    label: &label,
                    message,
                }
                .log()
            }))
        });
}

fn count(value: Option<&Value>) -> Option<usize> {
    value?.as_u64().and_then(|n| usize::try_from(n).ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArithmeticError {
    NotANumber,
    /// The float result is infinite or NaN, which JSON cannot carry.
    NonFinite,
}

type Arithmetic = Result<Value, ArithmeticError>;

fn float(x: f64) -> Arithmetic {
    Number::from_f64(x)
        .map(Value::Number)
        .ok_or(ArithmeticError::NonFinite)
}

fn floats(a: &Value, b: &Value) -> Result<(f64, f64), ArithmeticError> {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(ArithmeticError::NotANumber),
    }
}

pub(crate) fn sum(a: &Value, b: &Value) -> Arithmetic {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => match x.checked_add(y) {
            Some(total) => Ok(json!(total)),
            None => float(x as f64 + y as f64),
        },
        _ => floats(a, b).and_then(|(x, y)| float(x + y)),
    }
}

pub(crate) fn product(a: &Value, b: &Value) -> Arithmetic {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => match x.checked_mul(y) {
            Some(total) => Ok(json!(total)),
            None => float(x as f64 * y as f64),
        },
        _ => floats(a, b).and_then(|(x, y)| float(x * y)),
    }
}

fn keyed(key: &str, value: Value) -> Value {
    let mut request = Map::new();
    request.insert(key.to_string(), value);
    Value::Object(request)
}

fn arithmetic_failed(unit: &str, error: ArithmeticError, operand: &Value) -> GraphError {
    match error {
        ArithmeticError::NotANumber => {
            GraphError::function_failed(unit, format!("{} is not a number", operand))
        }
        ArithmeticError::NonFinite => GraphError::function_failed(
            unit,
            format!("result for {} is not a finite number", operand),
        ),
    }
}

fn unary(output: &str, op: fn(&Value) -> Arithmetic) -> Transform {
    let output = output.to_string();
    Rc::new(move |_: &Unit, inputs: Inputs| -> GraphResult<Outputs> {
        let value = inputs.value(0)?;
        let result = op(value).map_err(|e| arithmetic_failed(inputs.unit(), e, value))?;
        Ok(Outputs::one(output.as_str(), result))
    })
}

fn fold(output: &str, seed: Value, op: fn(&Value, &Value) -> Arithmetic) -> Transform {
    let output = output.to_string();
    Rc::new(move |_: &Unit, inputs: Inputs| -> GraphResult<Outputs> {
        let mut total = seed.clone();
        for item in inputs.batch(0)? {
            let value = item.as_value().ok_or_else(|| {
                GraphError::function_failed(inputs.unit(), "batch holds a non-value message")
            })?;
            total = op(&total, value).map_err(|e| arithmetic_failed(inputs.unit(), e, value))?;
        }
        Ok(Outputs::one(output.as_str(), total))
    })
}

fn trip_input(unit: &str, trip: &Trip) -> GraphResult<Value> {
    trip.lookup(INPUT_KEY).cloned().ok_or_else(|| {
        GraphError::function_failed(unit, format!("trip request has no '{}'", INPUT_KEY))
    })
}

fn hop_square(_: &Unit, inputs: Inputs) -> GraphResult<Outputs> {
    let mut trip = inputs.trip(0)?;
    let input = trip_input(inputs.unit(), &trip)?;
    let squared =
        product(&input, &input).map_err(|e| arithmetic_failed(inputs.unit(), e, &input))?;
    trip.merge_to(keyed(INPUT_KEY, squared));
    trip.next()?;
    Ok(Outputs::none())
}

fn hop_scale(_: &Unit, inputs: Inputs) -> GraphResult<Outputs> {
    let mut trip = inputs.trip(0)?;
    let input = trip_input(inputs.unit(), &trip)?;
    let factor = trip.lookup(FACTOR_KEY).cloned().unwrap_or(json!(1));
    let scaled =
        product(&input, &factor).map_err(|e| arithmetic_failed(inputs.unit(), e, &factor))?;
    trip.merge_to(keyed(INPUT_KEY, scaled));
    trip.next()?;
    Ok(Outputs::none())
}

fn dispatch_route(unit: &Unit, inputs: Inputs) -> GraphResult<Outputs> {
    let request = inputs.value(0)?;
    let route = request
        .get(ROUTE_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            GraphError::function_failed(unit.name(), format!("request has no '{}'", ROUTE_KEY))
        })?;
    let input = request.get(INPUT_KEY).cloned().ok_or_else(|| {
        GraphError::function_failed(unit.name(), format!("request has no '{}'", INPUT_KEY))
    })?;

    let mut trip = Trip::with_hops(unit.route(route)?);
    trip.attach(keyed(INPUT_KEY, input.clone()));
    trip.merge_to(keyed(INPUT_KEY, input));
    trip.next()?;
    Ok(Outputs::none())
}

/// Ends the trip; hops still left on it are dropped.
fn collect_result(output: &str) -> Transform {
    let output = output.to_string();
    Rc::new(move |_: &Unit, inputs: Inputs| -> GraphResult<Outputs> {
        let trip = inputs.trip(0)?;
        let answer = trip
            .from()
            .get(INPUT_KEY)
            .cloned()
            .ok_or_else(|| {
                GraphError::function_failed(
                    inputs.unit(),
                    format!("trip request has no '{}'", INPUT_KEY),
                )
            })?;
        Ok(Outputs::one(output.as_str(), answer))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_arithmetic_stays_integral() {
        assert_eq!(product(&json!(5), &json!(5)), Ok(json!(25)));
        assert_eq!(sum(&json!(2), &json!(3)), Ok(json!(5)));
        assert_eq!(product(&json!(2.5), &json!(2)), Ok(json!(5.0)));
        assert_eq!(
            product(&json!("x"), &json!(2)),
            Err(ArithmeticError::NotANumber)
        );
        assert_eq!(
            product(&json!(i64::MAX), &json!(2)),
            Ok(json!(i64::MAX as f64 * 2.0))
        );
    }

    #[test]
    fn test_overflowing_float_is_an_error() {
        assert_eq!(
            product(&json!(f64::MAX), &json!(2.0)),
            Err(ArithmeticError::NonFinite)
        );
        assert_eq!(
            sum(&json!(f64::MAX), &json!(f64::MAX)),
            Err(ArithmeticError::NonFinite)
        );
    }

    #[test]
    fn test_square_rejects_non_finite_result() {
        let square = unary("squares", |n| product(n, n));
        let unit = Unit::new(crate::config::UnitConfig::new("square")).unwrap();
        let inputs = Inputs::new(
            "square",
            std::rc::Rc::from(vec!["number".to_string()]),
            vec![json!(f64::MAX).into()],
        );
        let err = square(&unit, inputs).unwrap_err();
        assert!(matches!(err, GraphError::FunctionFailed { .. }));
        assert!(err.to_string().contains("not a finite number"));
    }

    #[test]
    fn test_count_values() {
        assert_eq!(count(Some(&json!(3))), Some(3));
        assert_eq!(count(Some(&json!(-1))), None);
        assert_eq!(count(None), None);
    }

    #[test]
    fn test_keyed_request() {
        assert_eq!(keyed("input", json!(5)), json!({ "input": 5 }));
    }
}
