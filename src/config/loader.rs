// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declarative network documents and the functions that load them.
//!
//! A document names functions and stages instead of containing code; a [`Registry`]
//! supplies the implementations when the document is compiled into a [`NetworkConfig`].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::config::graph::{
    ChannelConfig, FunctionConfig, HopConfig, NetworkConfig, ProviderConfig, UnitConfig,
};
use crate::config::registry::Registry;
use crate::config::validation::validate_network_document;
use crate::engine::{Message, Network, Strategy, UnitReference, Unwrap};
use crate::errors::{LoaderError, ValidationError};
use crate::observability::messages::config::{
    DocumentLoaded, UnknownStage, ValidationFailed,
};
use crate::observability::messages::StructuredLog;

/// Top-level network document.
///
/// # Example
/// ```yaml
/// name: equations
/// channels:
///   equations: {}
///   results: {}
///   answers: {}
/// functions:
///   - channels: [equations]
///     func: dispatch_route
///   - channels: [results]
///     func: collect_result
/// units:
///   square:
///     channels:
///       square: {}
///     functions:
///       - channels: [square]
///         func: hop_square
/// routes:
///   squared:
///     - unit: square
///       channel: square
///     - channel: results
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkDocument {
    pub name: String,
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelDocument>,
    #[serde(default)]
    pub functions: Vec<FunctionDocument>,
    #[serde(default)]
    pub units: BTreeMap<String, UnitDocument>,
    #[serde(default)]
    pub routes: BTreeMap<String, Vec<HopDocument>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitDocument {
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelDocument>,
    #[serde(default)]
    pub functions: Vec<FunctionDocument>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelDocument {
    pub default: Option<Value>,
    #[serde(default)]
    pub stateful: bool,
    #[serde(default)]
    pub pipes: Vec<PipeDocument>,
    pub provider: Option<ProviderDocument>,
}

/// A linked channel's provider. Without `unit`, the channel's own unit is meant.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderDocument {
    pub unit: Option<String>,
    pub channel: String,
}

/// A pipe stage, either `buffer_count` or `{stage: buffer_count, value: 2}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PipeDocument {
    Name(String),
    Stage { stage: String, value: Option<Value> },
}

impl PipeDocument {
    pub fn stage(&self) -> &str {
        match self {
            PipeDocument::Name(stage) => stage,
            PipeDocument::Stage { stage, .. } => stage,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            PipeDocument::Name(_) => None,
            PipeDocument::Stage { value, .. } => value.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionDocument {
    /// Aggregation strategy tag; unknown tags fall back to `first`.
    #[serde(rename = "type")]
    pub strategy: Option<String>,
    pub channels: Vec<String>,
    /// Registered function name.
    pub func: String,
    /// Output channel for builtins that publish a single value.
    pub output: Option<String>,
}

/// One hop of a route. Without `unit`, the network itself is meant.
#[derive(Debug, Clone, Deserialize)]
pub struct HopDocument {
    pub unit: Option<String>,
    pub channel: String,
    pub request: Option<Value>,
    /// Publish the hop request instead of the trip and continue.
    #[serde(default)]
    pub unwrap: bool,
}

/// Document encodings, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Toml,
    Json,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yaml" | "yml" => Some(DocumentFormat::Yaml),
            "toml" => Some(DocumentFormat::Toml),
            "json" => Some(DocumentFormat::Json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Yaml => "yaml",
            DocumentFormat::Toml => "toml",
            DocumentFormat::Json => "json",
        }
    }
}

pub fn parse_document(content: &str, format: DocumentFormat) -> Result<NetworkDocument, LoaderError> {
    let document = match format {
        DocumentFormat::Yaml => serde_yaml::from_str(content)?,
        DocumentFormat::Toml => toml::from_str(content)?,
        DocumentFormat::Json => serde_json::from_str(content)?,
    };
    Ok(document)
}

/// Read and parse a network document.
pub fn load_document<P: AsRef<Path>>(path: P) -> Result<NetworkDocument, LoaderError> {
    let path = path.as_ref();
    let format = DocumentFormat::from_path(path)
        .ok_or_else(|| LoaderError::UnsupportedFormat(path.to_path_buf()))?;
    let content = fs::read_to_string(path)?;
    let document = parse_document(&content, format)?;

    DocumentLoaded {
        path,
        format: format.as_str(),
        network: &document.name,
        units: document.units.len(),
        routes: document.routes.len(),
    }
    .log();
    Ok(document)
}

/// Read, parse and validate a network document against `registry`.
pub fn load_and_validate<P: AsRef<Path>>(
    path: P,
    registry: &Registry,
) -> Result<NetworkDocument, LoaderError> {
    let document = load_document(path)?;
    check(&document, registry)?;
    Ok(document)
}

/// Load a document, compile it and construct the network. The network is not started.
pub fn load_network<P: AsRef<Path>>(path: P, registry: &Registry) -> Result<Network, LoaderError> {
    let document = load_document(path)?;
    let config = build_network(&document, registry)?;
    Ok(Network::new(config)?)
}

/// Validate `document` and compile it into a [`NetworkConfig`].
pub fn build_network(
    document: &NetworkDocument,
    registry: &Registry,
) -> Result<NetworkConfig, LoaderError> {
    check(document, registry)?;

    let mut config = NetworkConfig::new(&document.name);
    config.channels = compile_channels(&document.name, &document.channels, registry);
    config.functions = compile_functions(&document.name, &document.functions, registry)?;

    for (name, unit) in &document.units {
        let compiled = UnitConfig {
            name: name.clone(),
            channels: compile_channels(name, &unit.channels, registry),
            functions: compile_functions(name, &unit.functions, registry)?,
        };
        config.units.insert(name.clone(), compiled);
    }

    for (route, hops) in &document.routes {
        config
            .routes
            .insert(route.clone(), hops.iter().map(compile_hop).collect());
    }
    Ok(config)
}

fn check(document: &NetworkDocument, registry: &Registry) -> Result<(), LoaderError> {
    validate_network_document(document, registry).map_err(|errors| {
        ValidationFailed {
            network: &document.name,
            errors: &errors,
        }
        .log();
        LoaderError::Invalid(errors)
    })
}

fn reference(unit: &Option<String>) -> UnitReference {
    match unit {
        Some(name) => UnitReference::Name(name.clone()),
        None => UnitReference::Current,
    }
}

fn compile_channels(
    unit: &str,
    channels: &BTreeMap<String, ChannelDocument>,
    registry: &Registry,
) -> BTreeMap<String, ChannelConfig> {
    channels
        .iter()
        .map(|(name, doc)| {
            let pipes = doc
                .pipes
                .iter()
                .map(|pipe| {
                    let stage = registry.stage(pipe.stage(), pipe.value());
                    if stage.is_none() {
                        UnknownStage {
                            unit,
                            channel: name,
                            stage: pipe.stage(),
                        }
                        .log();
                    }
                    stage
                })
                .collect();
            let config = ChannelConfig {
                default: doc.default.clone().map(Message::from),
                stateful: doc.stateful,
                pipes,
                provider: doc.provider.as_ref().map(|p| ProviderConfig {
                    unit: reference(&p.unit),
                    channel: p.channel.clone(),
                }),
            };
            (name.clone(), config)
        })
        .collect()
}

fn compile_functions(
    unit: &str,
    functions: &[FunctionDocument],
    registry: &Registry,
) -> Result<Vec<FunctionConfig>, LoaderError> {
    functions
        .iter()
        .map(|doc| {
            let func = registry
                .function(&doc.func, doc.output.as_deref())
                .ok_or_else(|| {
                    LoaderError::Invalid(vec![ValidationError::UnknownFunction {
                        unit: unit.to_string(),
                        function: doc.func.clone(),
                    }])
                })?;
            Ok(FunctionConfig {
                strategy: doc
                    .strategy
                    .as_deref()
                    .map(Strategy::from_tag)
                    .unwrap_or_default(),
                channels: doc.channels.clone(),
                func,
            })
        })
        .collect()
}

fn compile_hop(doc: &HopDocument) -> HopConfig {
    let mut hop = HopConfig::new(reference(&doc.unit), doc.channel.clone());
    if let Some(request) = &doc.request {
        hop = hop.request(request.clone());
    }
    if doc.unwrap {
        hop = hop.unwrap(Unwrap::Request);
    }
    hop
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SQUARE_YAML: &str = r#"
name: demo
units:
  square:
    channels:
      number: {}
      squares:
        pipes:
          - trace
          - stage: take
            value: 3
    functions:
      - type: first
        channels: [number]
        func: square
  double:
    channels:
      number:
        provider:
          unit: square
          channel: squares
      doubles: {}
    functions:
      - channels: [number]
        func: double
"#;

    fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parse_network_document() {
        let doc = parse_document(SQUARE_YAML, DocumentFormat::Yaml).unwrap();
        assert_eq!(doc.name, "demo");
        assert_eq!(doc.units.len(), 2);

        let squares = &doc.units["square"].channels["squares"];
        assert_eq!(squares.pipes.len(), 2);
        assert_eq!(squares.pipes[0].stage(), "trace");
        assert_eq!(squares.pipes[1].value(), Some(&serde_json::json!(3)));

        let provider = doc.units["double"].channels["number"].provider.as_ref().unwrap();
        assert_eq!(provider.unit.as_deref(), Some("square"));
        assert_eq!(doc.units["square"].functions[0].strategy.as_deref(), Some("first"));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("a/b.yml")),
            Some(DocumentFormat::Yaml)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("net.toml")),
            Some(DocumentFormat::Toml)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("net.ini")), None);
        assert_eq!(DocumentFormat::from_path(Path::new("net")), None);
    }

    #[test]
    fn test_load_unsupported_format() {
        let file = write_temp(".ini", SQUARE_YAML);
        assert!(matches!(
            load_document(file.path()),
            Err(LoaderError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_load_yaml_network() {
        let file = write_temp(".yaml", SQUARE_YAML);
        let network = load_network(file.path(), &Registry::with_builtins()).unwrap();
        assert_eq!(network.name(), "demo");
        assert!(network.unit("double").unwrap().get("number").is_resolved());
    }

    #[test]
    fn test_load_json_document() {
        let json = r#"{
            "name": "json",
            "channels": { "in": {}, "out": { "default": 0 } },
            "functions": [ { "channels": ["in"], "func": "double", "output": "out" } ]
        }"#;
        let file = write_temp(".json", json);
        let doc = load_document(file.path()).unwrap();
        assert_eq!(doc.functions[0].output.as_deref(), Some("out"));
        assert_eq!(doc.channels["out"].default, Some(serde_json::json!(0)));
    }

    #[test]
    fn test_load_toml_document() {
        let toml = r#"
name = "toml"

[channels.in]

[channels.out]
stateful = true

[[functions]]
channels = ["in"]
func = "square"
output = "out"

[[routes.direct]]
channel = "in"
unwrap = true
request = { input = 2 }
"#;
        let file = write_temp(".toml", toml);
        let doc = load_document(file.path()).unwrap();
        assert!(doc.channels["out"].stateful);
        assert!(doc.routes["direct"][0].unwrap);
        assert_eq!(doc.routes["direct"][0].unit, None);
    }

    #[test]
    fn test_invalid_document_lists_every_problem() {
        let yaml = r#"
name: broken
channels:
  in: {}
functions:
  - channels: [missing]
    func: nonexistent
"#;
        let file = write_temp(".yaml", yaml);
        let err = load_and_validate(file.path(), &Registry::with_builtins()).unwrap_err();
        let LoaderError::Invalid(errors) = &err else {
            panic!("expected validation failure, got {err}");
        };
        assert_eq!(errors.len(), 2);
        assert!(err.to_string().starts_with("Configuration validation failed:"));
    }

    #[test]
    fn test_unknown_stage_compiles_to_failing_pipe() {
        let yaml = r#"
name: piped
channels:
  in:
    pipes: [no_such_stage]
"#;
        let doc = parse_document(yaml, DocumentFormat::Yaml).unwrap();
        let config = build_network(&doc, &Registry::with_builtins()).unwrap();
        assert!(config.channels["in"].pipes[0].is_none());

        let network = Network::new(config).unwrap();
        let err = network.subscribe("in", |_| Ok(())).unwrap_err();
        assert!(matches!(err, crate::errors::GraphError::InvalidPipe { index: 0, .. }));
    }
}
