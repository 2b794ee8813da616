//! Tool metadata extraction.
//!
//! The script runs once in a non-sandboxed, throwaway VM; its top-level
//! side effects are contained to that VM and discarded. Only the global
//! `tool` table survives, as a [`ToolDef`].

use crate::definition::ToolDef;
use mlua::{Lua, Table, Value};
use std::path::Path;

/// Error from metadata extraction
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The script failed to read, parse or run
    #[error("executing lua file: {0}")]
    Exec(String),

    /// The script set no `tool` table
    #[error("no 'tool' table found")]
    NoToolTable,

    /// `tool.name` missing or empty
    #[error("tool.name is required")]
    MissingName,

    /// `tool.description` missing or empty
    #[error("tool.description is required")]
    MissingDescription,

    /// `tool.parameters` missing or empty
    #[error("tool.parameters is required")]
    MissingParameters,

    /// `tool.parameters` is not a JSON document
    #[error("tool.parameters is not valid JSON")]
    InvalidParametersJson,
}

/// Run a tool script in a throwaway VM and read its `tool` table.
///
/// # Errors
///
/// Returns an error when the script fails or the record violates the tool
/// definition invariants.
pub fn extract(path: &Path) -> Result<ToolDef, ExtractError> {
    let source = std::fs::read_to_string(path).map_err(|e| ExtractError::Exec(e.to_string()))?;

    let lua = Lua::new();
    lua.load(&source)
        .set_name(format!("@{}", path.display()))
        .exec()
        .map_err(|e| ExtractError::Exec(e.to_string()))?;

    let tool: Table = match lua.globals().get::<Value>("tool") {
        Ok(Value::Table(t)) => t,
        _ => return Err(ExtractError::NoToolTable),
    };

    let name = string_field(&lua, &tool, "name");
    let description = string_field(&lua, &tool, "description");
    let parameters = string_field(&lua, &tool, "parameters");

    if name.is_empty() {
        return Err(ExtractError::MissingName);
    }
    if description.is_empty() {
        return Err(ExtractError::MissingDescription);
    }
    if parameters.is_empty() {
        return Err(ExtractError::MissingParameters);
    }
    if serde_json::from_str::<serde_json::Value>(&parameters).is_err() {
        return Err(ExtractError::InvalidParametersJson);
    }

    Ok(ToolDef {
        name,
        description,
        parameters,
        claims: string_seq_field(&lua, &tool, "claims"),
        path: path.to_path_buf(),
    })
}

/// Read a field as a string through the VM's own coercion; missing or
/// non-coercible fields read as empty.
fn string_field(lua: &Lua, table: &Table, key: &str) -> String {
    table
        .get::<Value>(key)
        .ok()
        .and_then(|v| lua.coerce_string(v).ok().flatten())
        .map(|s| String::from_utf8_lossy(&s.as_bytes()).into_owned())
        .unwrap_or_default()
}

/// Read a field as a dense sequence of strings; anything else reads empty.
fn string_seq_field(lua: &Lua, table: &Table, key: &str) -> Vec<String> {
    let Ok(Value::Table(seq)) = table.get::<Value>(key) else {
        return Vec::new();
    };
    (1..=seq.raw_len())
        .filter_map(|i| seq.raw_get::<Value>(i).ok())
        .filter_map(|v| lua.coerce_string(v).ok().flatten())
        .map(|s| String::from_utf8_lossy(&s.as_bytes()).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn extract_source(source: &str) -> Result<ToolDef, ExtractError> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tool.lua");
        std::fs::write(&path, source).unwrap();
        extract(&path)
    }

    const GOOD: &str = r#"
tool = {
    name = "add",
    description = "Add two numbers",
    parameters = [[{"type":"object","properties":{"a":{"type":"number"},"b":{"type":"number"}},"required":["a","b"]}]]
}
function execute(args)
    return args.a + args.b
end
"#;

    #[test]
    fn test_extract_success() {
        let tool = extract_source(GOOD).unwrap();
        assert_eq!(tool.name, "add");
        assert_eq!(tool.description, "Add two numbers");
        assert!(serde_json::from_str::<serde_json::Value>(&tool.parameters).is_ok());
        assert!(tool.claims.is_empty());
    }

    #[test]
    fn test_extract_with_claims() {
        let tool = extract_source(
            r#"
tool = {
    name = "fetch",
    description = "Fetch a URL",
    parameters = "{}",
    claims = {"http.get", "log.append:fetches"}
}
"#,
        )
        .unwrap();
        assert_eq!(tool.claims, ["http.get", "log.append:fetches"]);
    }

    #[test]
    fn test_extract_records_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("add.lua");
        std::fs::write(&path, GOOD).unwrap();
        let tool = extract(&path).unwrap();
        assert_eq!(tool.path, path);
    }

    #[test]
    fn test_top_level_side_effects_contained() {
        // The extraction VM is unsandboxed and discarded; whatever the
        // script does at top level must not break metadata reading.
        let tool = extract_source(
            r#"
scratch = {}
for i = 1, 10 do scratch[i] = i * i end
tool = { name = "busy", description = "d", parameters = "{}" }
"#,
        )
        .unwrap();
        assert_eq!(tool.name, "busy");
    }

    #[test]
    fn test_bad_files() {
        let cases: [(&str, &str); 6] = [
            ("x = 1", "no 'tool' table"),
            (
                r#"tool = { description = "d", parameters = "{}" }"#,
                "tool.name is required",
            ),
            (
                r#"tool = { name = "x", parameters = "{}" }"#,
                "tool.description is required",
            ),
            (
                r#"tool = { name = "x", description = "d" }"#,
                "tool.parameters is required",
            ),
            (
                r#"tool = { name = "x", description = "d", parameters = "{not json" }"#,
                "not valid JSON",
            ),
            ("this is not lua(", "executing lua file"),
        ];
        for (source, want) in cases {
            let err = extract_source(source).unwrap_err();
            assert!(
                err.to_string().contains(want),
                "source {:?}: error {:?} should contain {:?}",
                source,
                err.to_string(),
                want
            );
        }
    }

    #[test]
    fn test_missing_file() {
        let err = extract(Path::new("/nonexistent/tool.lua")).unwrap_err();
        assert!(err.to_string().starts_with("executing lua file"));
    }
}
