//! The tool definition record.

use std::path::PathBuf;

/// Metadata extracted once from a tool script at registry load.
///
/// Invariants, enforced at extraction and load: `name`, `description` and
/// `parameters` are non-empty, `parameters` parses as JSON, every claim
/// satisfies the claim grammar, and no two tools share a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDef {
    /// Unique identifier, used as the RPC key
    pub name: String,
    /// Free-text description for the function-calling client
    pub description: String,
    /// JSON Schema for the arguments, kept raw for verbatim re-export
    pub parameters: String,
    /// Declared capability claims, in declaration order (duplicates are
    /// redundant but allowed)
    pub claims: Vec<String>,
    /// Filesystem path of the script
    pub path: PathBuf,
}
