// SPDX-License-Identifier: Apache-2.0

//! Template Registry
//!
//! Loads the configuration document and indexes compiled templates by name.
//! A document either loads completely or not at all.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use serde_json::value::RawValue;
use tracing::{info, instrument};

use apifed_core::{FederationError, FederationResult};

use super::definition::{Entries, TemplateDefinition};
use super::model::ApiTemplate;

/// Registry that holds all available API templates
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Arc<ApiTemplate>>,
}

impl TemplateRegistry {
    /// Creates a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles every template of a JSON configuration document.
    ///
    /// Fails on the first malformed template, naming it.
    pub fn from_json(json: &str) -> FederationResult<Self> {
        let document: Entries<Box<RawValue>> = serde_json::from_str(json).map_err(|e| {
            FederationError::config(format!("Unparsable template configuration: {e}"))
        })?;

        let mut registry = Self::new();
        for (name, raw) in document.iter() {
            if registry.contains(name) {
                return Err(FederationError::config(format!(
                    "Template '{name}' is defined more than once"
                )));
            }
            let definition: TemplateDefinition = serde_json::from_str(raw.get())
                .map_err(|e| FederationError::config(format!("Template '{name}': {e}")))?;
            registry.register(ApiTemplate::compile(name, &definition)?);
        }
        Ok(registry)
    }

    pub fn from_reader(mut reader: impl Read) -> FederationResult<Self> {
        let mut json = String::new();
        reader.read_to_string(&mut json).map_err(|e| {
            FederationError::config(format!("Failed to read template configuration: {e}"))
        })?;
        Self::from_json(&json)
    }

    /// Loads the configuration document at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> FederationResult<Self> {
        let path = path.as_ref();
        info!("Loading API template configuration from {}", path.display());

        let json = std::fs::read_to_string(path).map_err(|e| {
            FederationError::config(format!(
                "Failed to read template configuration {}: {e}",
                path.display()
            ))
        })?;
        let registry = Self::from_json(&json)?;

        info!("Registered {} API templates", registry.len());
        Ok(registry)
    }

    /// Registers a compiled template under its own name
    ///
    /// Returns the template previously registered under that name, if any.
    pub fn register(&mut self, template: ApiTemplate) -> Option<Arc<ApiTemplate>> {
        let name = template.name().to_string();
        self.templates.insert(name, Arc::new(template))
    }

    /// Gets a template by name
    pub fn get(&self, name: &str) -> FederationResult<Arc<ApiTemplate>> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| FederationError::not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Lists all registered template names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns true if no templates are registered
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
