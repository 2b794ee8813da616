//! Tool invocation: run a tool's `execute(args)` in a fresh sandboxed VM.

use crate::capability::CapabilityRegistry;
use crate::convert::json_to_lua;
use crate::sandbox::Sandbox;
use mlua::{MultiValue, Value};
use serde_json::Value as Json;
use std::path::Path;

/// Error from one invocation. Each variant carries a distinct message
/// prefix so callers can discriminate failure modes from the text alone.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// VM construction or argument marshalling failed
    #[error("building sandbox: {0}")]
    Sandbox(String),

    /// The tool script failed to read, parse or execute
    #[error("loading tool: {0}")]
    Load(String),

    /// The arguments JSON did not decode to an object
    #[error("parsing arguments: {0}")]
    ParseArguments(String),

    /// The script defined no `execute` function
    #[error("no 'execute' function found")]
    MissingExecute,

    /// `execute` raised a script error
    #[error("execute() failed: {0}")]
    ExecuteFailed(String),

    /// `execute` returned `(nil, message)`, the builtin error protocol;
    /// the message is surfaced verbatim
    #[error("{0}")]
    Builtin(String),

    /// The first return value could not be coerced to a string
    #[error("execute() must return a string")]
    NotAString,
}

/// Run a tool file's `execute(args)` under a sandbox built from its claims.
///
/// The first return value is coerced to a string with the VM's own
/// coercion, so numeric returns convert losslessly. A second return value
/// of a non-empty string paired with a nil first value is treated as a
/// script-level error and surfaced verbatim; otherwise it is discarded.
///
/// # Errors
///
/// See [`InvokeError`] for the failure taxonomy.
pub fn run_tool(
    path: &Path,
    claims: &[String],
    args_json: &str,
    caps: &CapabilityRegistry,
) -> Result<String, InvokeError> {
    let sandbox =
        Sandbox::new(claims, caps).map_err(|e| InvokeError::Sandbox(e.to_string()))?;
    let lua = sandbox.lua();

    let source =
        std::fs::read_to_string(path).map_err(|e| InvokeError::Load(e.to_string()))?;
    lua.load(&source)
        .set_name(format!("@{}", path.display()))
        .exec()
        .map_err(|e| InvokeError::Load(e.to_string()))?;

    let args: serde_json::Map<String, Json> = serde_json::from_str(args_json)
        .map_err(|e| InvokeError::ParseArguments(e.to_string()))?;

    let execute = match lua
        .globals()
        .get::<Value>("execute")
        .map_err(|e| InvokeError::Sandbox(e.to_string()))?
    {
        Value::Function(f) => f,
        _ => return Err(InvokeError::MissingExecute),
    };

    let args_table = json_to_lua(lua, &Json::Object(args))
        .map_err(|e| InvokeError::Sandbox(e.to_string()))?;

    let returns: MultiValue = execute
        .call(args_table)
        .map_err(|e| InvokeError::ExecuteFailed(e.to_string()))?;
    let mut returns = returns.into_iter();
    let first = returns.next().unwrap_or(Value::Nil);
    let second = returns.next().unwrap_or(Value::Nil);

    // (nil, message) from a builtin propagated through execute()
    if matches!(first, Value::Nil) {
        if let Ok(Some(message)) = lua.coerce_string(second) {
            let message = String::from_utf8_lossy(&message.as_bytes()).into_owned();
            if !message.is_empty() {
                return Err(InvokeError::Builtin(message));
            }
        }
    }

    lua.coerce_string(first)
        .ok()
        .flatten()
        .map(|s| String::from_utf8_lossy(&s.as_bytes()).into_owned())
        .ok_or(InvokeError::NotAString)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_tool(dir: &TempDir, name: &str, source: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, source).unwrap();
        path
    }

    fn run(source: &str, claims: &[&str], args: &str) -> Result<String, InvokeError> {
        let dir = TempDir::new().unwrap();
        let path = write_tool(&dir, "tool.lua", source);
        let caps = CapabilityRegistry::with_log_root(dir.path().join("logs"));
        let claims: Vec<String> = claims.iter().map(|c| c.to_string()).collect();
        run_tool(&path, &claims, args, &caps)
    }

    const ADD: &str = r#"
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
    fn test_add() {
        assert_eq!(run(ADD, &[], r#"{"a":2,"b":3}"#).unwrap(), "5");
    }

    #[test]
    fn test_echo() {
        let source = r#"
tool = { name = "echo", description = "Echo", parameters = "{}" }
function execute(args)
    return args.message
end
"#;
        let result = run(source, &[], r#"{"message":"hello world"}"#).unwrap();
        assert_eq!(result, "hello world");
    }

    #[test]
    fn test_nested_args() {
        let source = r#"
tool = { name = "nested", description = "Nested", parameters = "{}" }
function execute(args)
    return args.user.name .. ":" .. tostring(args.user.age) .. ":" .. tostring(#args.tags)
end
"#;
        let result = run(
            source,
            &[],
            r#"{"user":{"name":"Alice","age":30},"tags":["a","b"]}"#,
        )
        .unwrap();
        assert_eq!(result, "Alice:30:2");
    }

    #[test]
    fn test_array_args() {
        let source = r#"
tool = { name = "concat", description = "Concat", parameters = "{}" }
function execute(args)
    return table.concat(args.items, ",")
end
"#;
        let result = run(source, &[], r#"{"items":["x","y","z"]}"#).unwrap();
        assert_eq!(result, "x,y,z");
    }

    #[test]
    fn test_numeric_return_coerces() {
        let source = r#"
tool = { name = "n", description = "n", parameters = "{}" }
function execute(args)
    return 42
end
"#;
        assert_eq!(run(source, &[], "{}").unwrap(), "42");
    }

    #[test]
    fn test_missing_execute() {
        let source = r#"tool = { name = "x", description = "x", parameters = "{}" }"#;
        let err = run(source, &[], "{}").unwrap_err();
        assert_eq!(err.to_string(), "no 'execute' function found");
    }

    #[test]
    fn test_invalid_args_json() {
        let err = run(ADD, &[], "not-json").unwrap_err();
        assert!(err.to_string().starts_with("parsing arguments"));
    }

    #[test]
    fn test_non_object_args_rejected() {
        let err = run(ADD, &[], "[1,2]").unwrap_err();
        assert!(err.to_string().starts_with("parsing arguments"));
    }

    #[test]
    fn test_script_syntax_error_is_load_error() {
        let err = run("this is not lua(", &[], "{}").unwrap_err();
        assert!(err.to_string().starts_with("loading tool"));
    }

    #[test]
    fn test_runtime_error_has_execute_prefix() {
        // Missing args make the addition a nil-arithmetic error.
        let err = run(ADD, &[], "{}").unwrap_err();
        assert!(err.to_string().starts_with("execute() failed"));
    }

    #[test]
    fn test_calling_unclaimed_builtin_fails() {
        let source = r#"
tool = { name = "h", description = "h", parameters = "{}", claims = {"http.get"} }
function execute(args)
    local resp = http.get(args.url)
    return tostring(resp.status) .. ":" .. resp.body
end
"#;
        // Claims deliberately not granted: http is nil inside the VM.
        let err = run(source, &[], r#"{"url":"http://localhost"}"#).unwrap_err();
        assert!(err.to_string().starts_with("execute() failed"));
    }

    #[test]
    fn test_builtin_error_surfaces_verbatim() {
        let source = r#"
tool = { name = "d", description = "d", parameters = "{}" }
function execute(args)
    local value, err = json.decode("{")
    return value, err
end
"#;
        let err = run(source, &[], "{}").unwrap_err();
        assert!(matches!(err, InvokeError::Builtin(_)));
        assert!(err.to_string().starts_with("decoding value"));
    }

    #[test]
    fn test_explicit_nil_error_pair() {
        let source = r#"
tool = { name = "e", description = "e", parameters = "{}" }
function execute(args)
    return nil, "custom failure"
end
"#;
        let err = run(source, &[], "{}").unwrap_err();
        assert_eq!(err.to_string(), "custom failure");
    }

    #[test]
    fn test_second_return_discarded_when_first_set() {
        let source = r#"
tool = { name = "s", description = "s", parameters = "{}" }
function execute(args)
    return "value", "ignored"
end
"#;
        assert_eq!(run(source, &[], "{}").unwrap(), "value");
    }

    #[test]
    fn test_nil_return_is_not_a_string() {
        let source = r#"
tool = { name = "nilly", description = "n", parameters = "{}" }
function execute(args)
    return nil
end
"#;
        let err = run(source, &[], "{}").unwrap_err();
        assert_eq!(err.to_string(), "execute() must return a string");
    }

    #[test]
    fn test_boolean_return_is_not_a_string() {
        let source = r#"
tool = { name = "b", description = "b", parameters = "{}" }
function execute(args)
    return true
end
"#;
        let err = run(source, &[], "{}").unwrap_err();
        assert!(matches!(err, InvokeError::NotAString));
    }

    #[test]
    fn test_log_append_through_invocation() {
        let dir = TempDir::new().unwrap();
        let path = write_tool(
            &dir,
            "log_tool.lua",
            r#"
tool = { name = "log_tool", description = "Log", parameters = "{}", claims = {"log.append:testns"} }
function execute(args)
    return testns.append({msg = "hello"})
end
"#,
        );
        let caps = CapabilityRegistry::with_log_root(dir.path().join("logs"));
        let result =
            run_tool(&path, &["log.append:testns".to_string()], "{}", &caps).unwrap();
        assert_eq!(result, "Logged to testns");
        assert!(dir.path().join("logs").join("testns").is_dir());
    }

    #[test]
    fn test_log_verb_types_visible_from_script() {
        let source = r#"
tool = { name = "iso", description = "i", parameters = "{}", claims = {"log.append:myns"} }
function execute(args)
    return type(myns.append) .. "," .. type(myns.query)
end
"#;
        let result = run(source, &["log.append:myns"], "{}").unwrap();
        assert_eq!(result, "function,nil");
    }

    #[test]
    fn test_fresh_vm_per_invocation() {
        let dir = TempDir::new().unwrap();
        let path = write_tool(
            &dir,
            "counter.lua",
            r#"
tool = { name = "counter", description = "c", parameters = "{}" }
counter = (counter or 0) + 1
function execute(args)
    return counter
end
"#,
        );
        let caps = CapabilityRegistry::with_log_root(dir.path().join("logs"));
        // Top-level state cannot leak between invocations.
        assert_eq!(run_tool(&path, &[], "{}", &caps).unwrap(), "1");
        assert_eq!(run_tool(&path, &[], "{}", &caps).unwrap(), "1");
    }
}
