// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Validation of network documents before they are compiled.
//!
//! # Validation Pipeline
//!
//! 1. **Naming**: no child unit may shadow the network's own name
//! 2. **Functions**: every function is registered, has inputs, and reads declared channels
//! 3. **References**: providers and hops point at units that exist
//! 4. **Link cycles**: linked channels eventually reach a stored channel
//!
//! Cycle detection needs every reference to resolve, so it only runs when steps 1-3 found
//! nothing. All other problems are accumulated and reported together.
//!
//! ## Cycle Detection Algorithm
//! Depth-first search with a recursion stack over `unit.channel` nodes, one edge from each
//! linked channel to its provider. Meeting a node that is still on the stack means a cycle;
//! the path from that node back to itself is reported.
//!
//! # Examples
//!
//! ```rust
//! use the_junction::config::{parse_document, validate_network_document, DocumentFormat, Registry};
//! use the_junction::errors::ValidationError;
//!
//! let yaml = r#"
//! name: net
//! units:
//!   a:
//!     channels:
//!       x: { provider: { unit: b, channel: y } }
//!   b:
//!     channels:
//!       y: { provider: { unit: a, channel: x } }
//! "#;
//! let document = parse_document(yaml, DocumentFormat::Yaml).unwrap();
//!
//! match validate_network_document(&document, &Registry::with_builtins()) {
//!     Err(errors) => assert!(matches!(errors[0], ValidationError::LinkCycle { .. })),
//!     Ok(()) => panic!("cycle went unnoticed"),
//! }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::loader::{ChannelDocument, FunctionDocument, NetworkDocument};
use crate::config::registry::Registry;
use crate::errors::ValidationError;
use crate::observability::messages::config::LinkCycleDetected;
use crate::observability::messages::StructuredLog;

/// Validate `document` against `registry`, collecting every problem found.
pub fn validate_network_document(
    document: &NetworkDocument,
    registry: &Registry,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if document.units.contains_key(&document.name) {
        errors.push(ValidationError::ShadowedNetworkName {
            unit: document.name.clone(),
        });
    }

    for (unit, channels, functions) in units_of(document) {
        errors.extend(validate_functions(unit, channels, functions, registry));
    }

    errors.extend(validate_references(document));

    if errors.is_empty() {
        if let Some(cycle) = find_link_cycle(document) {
            LinkCycleDetected { cycle: &cycle }.log();
            errors.push(ValidationError::LinkCycle { cycle });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

type UnitView<'a> = (
    &'a str,
    &'a BTreeMap<String, ChannelDocument>,
    &'a [FunctionDocument],
);

/// The network's own unit followed by its children.
fn units_of(document: &NetworkDocument) -> Vec<UnitView<'_>> {
    let mut units: Vec<UnitView<'_>> = vec![(
        document.name.as_str(),
        &document.channels,
        document.functions.as_slice(),
    )];
    units.extend(document.units.iter().map(|(name, unit)| {
        (name.as_str(), &unit.channels, unit.functions.as_slice())
    }));
    units
}

fn validate_functions(
    unit: &str,
    channels: &BTreeMap<String, ChannelDocument>,
    functions: &[FunctionDocument],
    registry: &Registry,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (index, function) in functions.iter().enumerate() {
        if !registry.has_function(&function.func) {
            errors.push(ValidationError::UnknownFunction {
                unit: unit.to_string(),
                function: function.func.clone(),
            });
        }
        if function.channels.is_empty() {
            errors.push(ValidationError::EmptyFunctionInputs {
                unit: unit.to_string(),
                index,
            });
        }
        for channel in &function.channels {
            if !channels.contains_key(channel) {
                errors.push(ValidationError::UndeclaredInput {
                    unit: unit.to_string(),
                    index,
                    channel: channel.clone(),
                });
            }
        }
    }
    errors
}

fn validate_references(document: &NetworkDocument) -> Vec<ValidationError> {
    let known = |name: &str| name == document.name || document.units.contains_key(name);
    let mut errors = Vec::new();

    for (unit, channels, _) in units_of(document) {
        for (channel, spec) in channels {
            let Some(provider) = &spec.provider else {
                continue;
            };
            if let Some(target) = &provider.unit {
                if !known(target) {
                    errors.push(ValidationError::UnknownUnitReference {
                        origin: format!("{}.{}", unit, channel),
                        unit: target.clone(),
                    });
                }
            }
        }
    }

    for (route, hops) in &document.routes {
        for hop in hops {
            if let Some(target) = &hop.unit {
                if !known(target) {
                    errors.push(ValidationError::UnknownUnitReference {
                        origin: format!("route {}", route),
                        unit: target.clone(),
                    });
                }
            }
        }
    }
    errors
}

/// Find a chain of linked channels that leads back to itself.
fn find_link_cycle(document: &NetworkDocument) -> Option<Vec<String>> {
    let mut graph: HashMap<String, Vec<String>> = HashMap::new();
    for (unit, channels, _) in units_of(document) {
        for (channel, spec) in channels {
            let node = format!("{}.{}", unit, channel);
            let edges = graph.entry(node).or_default();
            if let Some(provider) = &spec.provider {
                let target = provider.unit.as_deref().unwrap_or(unit);
                edges.push(format!("{}.{}", target, provider.channel));
            }
        }
    }

    let mut nodes: Vec<&String> = graph.keys().collect();
    nodes.sort();

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();
    for node in nodes {
        if !visited.contains(node.as_str()) {
            if let Some(cycle) = dfs_cycle_detection(node, &graph, &mut visited, &mut rec_stack, &mut path)
            {
                return Some(cycle);
            }
        }
    }
    None
}

fn dfs_cycle_detection(
    node: &str,
    graph: &HashMap<String, Vec<String>>,
    visited: &mut HashSet<String>,
    rec_stack: &mut HashSet<String>,
    path: &mut Vec<String>,
) -> Option<Vec<String>> {
    visited.insert(node.to_string());
    rec_stack.insert(node.to_string());
    path.push(node.to_string());

    if let Some(neighbors) = graph.get(node) {
        for neighbor in neighbors {
            if !visited.contains(neighbor) {
                if let Some(cycle) = dfs_cycle_detection(neighbor, graph, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(neighbor) {
                let start = path.iter().position(|x| x == neighbor).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(neighbor.clone());
                return Some(cycle);
            }
        }
    }

    rec_stack.remove(node);
    path.pop();
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::{parse_document, DocumentFormat};

    fn validate(yaml: &str) -> Result<(), Vec<ValidationError>> {
        let document = parse_document(yaml, DocumentFormat::Yaml).unwrap();
        validate_network_document(&document, &Registry::with_builtins())
    }

    #[test]
    fn test_valid_empty_network() {
        assert!(validate("name: empty").is_ok());
    }

    #[test]
    fn test_valid_linked_network() {
        let yaml = r#"
name: net
units:
  square:
    channels:
      number: {}
      squares: {}
    functions:
      - channels: [number]
        func: square
  double:
    channels:
      number: { provider: { unit: square, channel: squares } }
      doubles: {}
    functions:
      - channels: [number]
        func: double
"#;
        assert!(validate(yaml).is_ok());
    }

    #[test]
    fn test_function_problems_are_all_reported() {
        let yaml = r#"
name: net
channels:
  a: {}
functions:
  - channels: []
    func: square
  - channels: [a, b]
    func: mystery
"#;
        let errors = validate(yaml).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyFunctionInputs {
                    unit: "net".to_string(),
                    index: 0
                },
                ValidationError::UnknownFunction {
                    unit: "net".to_string(),
                    function: "mystery".to_string()
                },
                ValidationError::UndeclaredInput {
                    unit: "net".to_string(),
                    index: 1,
                    channel: "b".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_unknown_references() {
        let yaml = r#"
name: net
units:
  a:
    channels:
      x: { provider: { unit: ghost, channel: y } }
routes:
  r:
    - unit: phantom
      channel: c
"#;
        let errors = validate(yaml).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&ValidationError::UnknownUnitReference {
            origin: "a.x".to_string(),
            unit: "ghost".to_string()
        }));
        assert!(errors.contains(&ValidationError::UnknownUnitReference {
            origin: "route r".to_string(),
            unit: "phantom".to_string()
        }));
    }

    #[test]
    fn test_shadowed_network_name() {
        let yaml = r#"
name: net
units:
  net:
    channels:
      c: {}
"#;
        assert_eq!(
            validate(yaml).unwrap_err(),
            vec![ValidationError::ShadowedNetworkName {
                unit: "net".to_string()
            }]
        );
    }

    #[test]
    fn test_self_link_cycle() {
        let yaml = r#"
name: net
channels:
  loop: { provider: { channel: loop } }
"#;
        assert_eq!(
            validate(yaml).unwrap_err(),
            vec![ValidationError::LinkCycle {
                cycle: vec!["net.loop".to_string(), "net.loop".to_string()]
            }]
        );
    }

    #[test]
    fn test_mutual_links_with_stored_root_are_fine() {
        let yaml = r#"
name: net
units:
  a:
    channels:
      out: {}
      in: { provider: { unit: b, channel: out } }
  b:
    channels:
      out: {}
      in: { provider: { unit: a, channel: out } }
"#;
        assert!(validate(yaml).is_ok());
    }

    #[test]
    fn test_three_unit_link_cycle_path() {
        let yaml = r#"
name: net
units:
  a:
    channels:
      x: { provider: { unit: b, channel: x } }
  b:
    channels:
      x: { provider: { unit: c, channel: x } }
  c:
    channels:
      x: { provider: { unit: a, channel: x } }
"#;
        let errors = validate(yaml).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::LinkCycle {
                cycle: vec![
                    "a.x".to_string(),
                    "b.x".to_string(),
                    "c.x".to_string(),
                    "a.x".to_string()
                ]
            }]
        );
    }
}
