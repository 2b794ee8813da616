//! The tool registry: built once at startup, read-only thereafter.
//!
//! Loading is all-or-nothing — any script that fails to extract, declares
//! an unknown claim, or collides on name aborts registry construction.

use crate::definition::ToolDef;
use crate::extract::{extract, ExtractError};
use bingus_core::Claim;
use bingus_vm::{run_tool, CapabilityRegistry, InvokeError};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::value::RawValue;
use std::path::Path;

/// Error aborting registry construction
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The tools directory could not be read
    #[error("reading tools directory: {0}")]
    ReadDir(#[source] std::io::Error),

    /// A script failed metadata extraction
    #[error("loading {file}: {source}")]
    Load {
        /// File name of the failing script
        file: String,
        /// Underlying extraction failure
        source: ExtractError,
    },

    /// A tool declared a claim outside the grammar
    #[error("tool {tool:?} has unknown claim {claim:?}")]
    UnknownClaim {
        /// Declaring tool
        tool: String,
        /// The rejected claim string
        claim: String,
    },

    /// Two scripts declared the same tool name
    #[error("duplicate tool name {0:?}")]
    DuplicateName(String),
}

/// Error from one call
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// No tool registered under the requested name
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The invocation itself failed
    #[error(transparent)]
    Invoke(#[from] InvokeError),
}

/// One entry of the function-calling schema export
#[derive(Debug, Clone, Serialize)]
pub struct FunctionExport {
    /// Always the literal `"function"`
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// The function declaration
    pub function: FunctionDecl,
}

/// Function declaration within a schema export
#[derive(Debug, Clone, Serialize)]
pub struct FunctionDecl {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// The stored JSON Schema, re-embedded verbatim
    pub parameters: Box<RawValue>,
}

/// Immutable map of tool name to definition, plus the capability tables
/// used to sandbox each invocation.
#[derive(Debug)]
pub struct ToolRegistry {
    tools: IndexMap<String, ToolDef>,
    exports: Vec<FunctionExport>,
    caps: CapabilityRegistry,
}

impl ToolRegistry {
    /// Scan a directory for `*.lua` tool scripts and build the registry.
    ///
    /// # Errors
    ///
    /// Returns the first load, claim or duplicate-name failure; on any
    /// error the registry does not start.
    pub fn load(dir: &Path, caps: CapabilityRegistry) -> Result<Self, RegistryError> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .map_err(RegistryError::ReadDir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".lua"))
            .collect();
        names.sort();

        let mut tools = IndexMap::new();
        let mut exports = Vec::new();
        for file in names {
            let tool = extract(&dir.join(&file)).map_err(|source| RegistryError::Load {
                file: file.clone(),
                source,
            })?;

            for claim in &tool.claims {
                if !Claim::is_valid(claim) {
                    return Err(RegistryError::UnknownClaim {
                        tool: tool.name.clone(),
                        claim: claim.clone(),
                    });
                }
            }
            if tools.contains_key(&tool.name) {
                return Err(RegistryError::DuplicateName(tool.name.clone()));
            }

            let export = export_entry(&tool).map_err(|_| RegistryError::Load {
                file: file.clone(),
                source: ExtractError::InvalidParametersJson,
            })?;

            tracing::debug!(tool = %tool.name, file = %file, "registered tool");
            exports.push(export);
            tools.insert(tool.name.clone(), tool);
        }

        Ok(Self {
            tools,
            exports,
            caps,
        })
    }

    /// Invoke a tool by name with a JSON arguments document.
    ///
    /// # Errors
    ///
    /// Returns `unknown tool: <name>` for unregistered names, otherwise the
    /// invocation failure.
    pub fn call(&self, name: &str, args_json: &str) -> Result<String, CallError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| CallError::UnknownTool(name.to_string()))?;
        Ok(run_tool(&tool.path, &tool.claims, args_json, &self.caps)?)
    }

    /// The function-calling schema export for every registered tool.
    #[must_use]
    pub fn schemas(&self) -> &[FunctionExport] {
        &self.exports
    }

    /// Look up a tool definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDef> {
        self.tools.get(name)
    }

    /// Registered tool names, in load order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry holds no tools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn export_entry(tool: &ToolDef) -> Result<FunctionExport, serde_json::Error> {
    Ok(FunctionExport {
        kind: "function",
        function: FunctionDecl {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: RawValue::from_string(tool.parameters.clone())?,
        },
    })
}
