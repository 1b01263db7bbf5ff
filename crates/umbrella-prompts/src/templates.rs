//! Template loading for stage prompts.
//!
//! Supports the prompts.yaml format with:
//! - One named template per stage id, each with a system and user part
//! - Shared partials (the response contract every stage renders)

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;

use crate::PromptError;

static EMBEDDED: Lazy<Result<TemplatesFile, String>> =
    Lazy::new(|| TemplatesFile::from_yaml(include_str!("../templates/prompts.yaml")));

/// Top-level templates file structure
#[derive(Debug, Clone, Deserialize)]
pub struct TemplatesFile {
    pub version: String,
    pub templates: HashMap<String, PromptTemplate>,
    #[serde(default)]
    pub partials: HashMap<String, String>,
}

/// A single prompt definition
#[derive(Debug, Clone, Deserialize)]
pub struct PromptTemplate {
    pub description: String,
    pub system: String,
    /// Absent for templates whose user turns come from the caller (chat)
    #[serde(default)]
    pub user: Option<String>,
}

impl TemplatesFile {
    /// The templates compiled into the crate
    pub fn embedded() -> Result<Self, PromptError> {
        EMBEDDED.clone().map_err(PromptError::Parse)
    }

    /// Load templates from a YAML file
    pub fn load(path: &str) -> Result<Self, PromptError> {
        let content = std::fs::read_to_string(path).map_err(|e| PromptError::Io {
            path: path.to_string(),
            detail: e.to_string(),
        })?;
        Self::from_yaml(&content).map_err(PromptError::Parse)
    }

    /// Parse templates from YAML content
    pub fn from_yaml(yaml: &str) -> Result<Self, String> {
        serde_yaml::from_str(yaml).map_err(|e| format!("Failed to parse templates YAML: {}", e))
    }

    /// Get a template by name
    pub fn get(&self, name: &str) -> Option<&PromptTemplate> {
        self.templates.get(name)
    }

    /// List all template names
    pub fn list_templates(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}
