// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Named function and stage implementations available to network documents.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::config::builtins;
use crate::config::graph::Transform;
use crate::engine::{Inputs, Outputs, Unit};
use crate::errors::GraphResult;
use crate::stream::stages::Stage;

/// Builds a function body, given the document's `output` channel if it named one.
pub type FunctionFactory = Rc<dyn Fn(Option<&str>) -> Transform>;
/// Builds a stage from the document's `value`; `None` means the value was unusable.
pub type StageFactory = Rc<dyn Fn(Option<&Value>) -> Option<Stage>>;

#[derive(Clone, Default)]
pub struct Registry {
    functions: HashMap<String, FunctionFactory>,
    stages: HashMap<String, StageFactory>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every builtin function and stage.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtins::register(&mut registry);
        registry
    }

    /// Register a function that ignores the document's `output` field.
    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        func: impl Fn(&Unit, Inputs) -> GraphResult<Outputs> + 'static,
    ) -> &mut Self {
        let func: Transform = Rc::new(func);
        self.functions
            .insert(name.into(), Rc::new(move |_| Rc::clone(&func)));
        self
    }

    pub fn register_factory(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(Option<&str>) -> Transform + 'static,
    ) -> &mut Self {
        self.functions.insert(name.into(), Rc::new(factory));
        self
    }

    pub fn register_stage(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(Option<&Value>) -> Option<Stage> + 'static,
    ) -> &mut Self {
        self.stages.insert(name.into(), Rc::new(factory));
        self
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn function(&self, name: &str, output: Option<&str>) -> Option<Transform> {
        self.functions.get(name).map(|factory| factory(output))
    }

    /// Build stage `name`. Unknown names and unusable values both yield `None`.
    pub fn stage(&self, name: &str, value: Option<&Value>) -> Option<Stage> {
        self.stages.get(name).and_then(|factory| factory(value))
    }

    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stages: Vec<&str> = self.stages.keys().map(String::as_str).collect();
        stages.sort_unstable();
        f.debug_struct("Registry")
            .field("functions", &self.function_names())
            .field("stages", &stages)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtins_are_registered() {
        let registry = Registry::with_builtins();
        for name in [
            "square",
            "double",
            "sum_batch",
            "product_batch",
            "hop_square",
            "hop_scale",
            "dispatch_route",
            "collect_result",
        ] {
            assert!(registry.has_function(name), "missing builtin {name}");
        }
        assert!(registry.stage("buffer_count", Some(&json!(2))).is_some());
        assert!(registry.stage("take", Some(&json!(1))).is_some());
        assert!(registry.stage("skip", Some(&json!(1))).is_some());
        assert!(registry.stage("trace", None).is_some());
    }

    #[test]
    fn test_unusable_stage_values() {
        let registry = Registry::with_builtins();
        assert!(registry.stage("buffer_count", None).is_none());
        assert!(registry.stage("buffer_count", Some(&json!("two"))).is_none());
        assert!(registry.stage("buffer_count", Some(&json!(0))).is_none());
        assert!(registry.stage("nope", None).is_none());
    }

    #[test]
    fn test_custom_function() {
        let mut registry = Registry::new();
        registry.register_function("noop", |_, _| Ok(Outputs::none()));
        assert!(registry.has_function("noop"));
        assert!(registry.function("noop", Some("ignored")).is_some());
        assert!(registry.function("other", None).is_none());
        assert_eq!(registry.function_names(), vec!["noop"]);
    }
}
