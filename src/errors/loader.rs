// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors for loading network documents from disk and compiling them into networks.

use crate::errors::{GraphError, ValidationError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    /// File I/O error while reading a document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The file extension does not map to a supported document format.
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(PathBuf),

    /// The document failed validation; every problem found is listed.
    #[error("Configuration validation failed:\n{}", render(.0))]
    Invalid(Vec<ValidationError>),

    /// The document was valid but the network could not be constructed.
    #[error("Network construction failed: {0}")]
    Graph(#[from] GraphError),
}

fn render(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
