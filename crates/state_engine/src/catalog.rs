//! JSON catalog: the serialized list of state definitions an app ships with.

use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::catalog_error::{CatalogError, CatalogLoadError, UnknownState};
use crate::definition::{StateDefinition, StateId};
use crate::registry::StateRegistry;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateCatalog {
    /// State activated once at startup, if any.
    #[serde(default)]
    pub default_state: Option<String>,
    pub states: Vec<StateDefinition>,
}

impl StateCatalog {
    pub fn new(states: Vec<StateDefinition>) -> Self {
        Self {
            default_state: None,
            states,
        }
    }

    pub fn with_default_state(mut self, name: impl Into<String>) -> Self {
        self.default_state = Some(name.into());
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogLoadError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogLoadError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&json)?;
        info!(
            "Read state catalog from {} ({} states)",
            path.display(),
            catalog.states.len()
        );
        Ok(catalog)
    }

    pub fn to_json_pretty(&self) -> Result<String, CatalogLoadError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate and build the registry, resolving the default state.
    pub fn build_registry(self) -> Result<(StateRegistry, Option<StateId>), CatalogLoadError> {
        let registry = StateRegistry::build(self.states)?;
        let default_state = match self.default_state {
            Some(name) => Some(registry.lookup(&name).map_err(|UnknownState(name)| {
                CatalogError::UnknownReference {
                    state: "default_state".to_string(),
                    reference: name,
                }
            })?),
            None => None,
        };
        Ok((registry, default_state))
    }
}
