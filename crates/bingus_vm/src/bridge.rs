//! The function bridge: the only way host code becomes visible to script.
//!
//! Host functions are described by a tagged variant over a small set of
//! adapter shapes; a single dispatcher turns each into a Lua callable.
//! Host errors surface to script as the `(nil, message)` pair; successful
//! results come back as one marshalled value.

use crate::convert::{json_to_lua, lua_to_json};
use mlua::{Function, Lua, MultiValue, Value};
use serde_json::Value as Json;

/// Error from a host builtin, surfaced to script as `(nil, message)`
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Value could not be encoded to JSON
    #[error("encoding value: {0}")]
    Encode(#[source] serde_json::Error),

    /// Input could not be decoded from JSON
    #[error("decoding value: {0}")]
    Decode(#[source] serde_json::Error),

    /// Filesystem failure, passed through with the OS error text
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Log store failure
    #[error(transparent)]
    Log(#[from] bingus_log::LogError),
}

/// Result of a host builtin
pub type HostResult = Result<Json, HostError>;

/// A host function in one of the supported adapter shapes.
///
/// String parameters are coerced with the VM's own string coercion; missing
/// arguments become zero values. `Passthrough` hands the first argument
/// across as a marshalled host value.
pub enum HostFn {
    /// `f() -> T`
    Nullary(Box<dyn Fn() -> HostResult + Send + Sync>),
    /// `f(string) -> T`
    Unary(Box<dyn Fn(String) -> HostResult + Send + Sync>),
    /// `f(string, string) -> T`
    Binary(Box<dyn Fn(String, String) -> HostResult + Send + Sync>),
    /// `f(string, string, string) -> T`
    Ternary(Box<dyn Fn(String, String, String) -> HostResult + Send + Sync>),
    /// `f(value) -> T`, argument passed through untyped
    Passthrough(Box<dyn Fn(Json) -> HostResult + Send + Sync>),
}

impl HostFn {
    /// Wrap a no-argument host function
    pub fn nullary(f: impl Fn() -> HostResult + Send + Sync + 'static) -> Self {
        Self::Nullary(Box::new(f))
    }

    /// Wrap a one-string-argument host function
    pub fn unary(f: impl Fn(String) -> HostResult + Send + Sync + 'static) -> Self {
        Self::Unary(Box::new(f))
    }

    /// Wrap a two-string-argument host function
    pub fn binary(f: impl Fn(String, String) -> HostResult + Send + Sync + 'static) -> Self {
        Self::Binary(Box::new(f))
    }

    /// Wrap a three-string-argument host function
    pub fn ternary(
        f: impl Fn(String, String, String) -> HostResult + Send + Sync + 'static,
    ) -> Self {
        Self::Ternary(Box::new(f))
    }

    /// Wrap a host function taking one arbitrary value
    pub fn passthrough(f: impl Fn(Json) -> HostResult + Send + Sync + 'static) -> Self {
        Self::Passthrough(Box::new(f))
    }
}

/// Turn a host function into a script-callable.
///
/// # Errors
///
/// Returns an error if the VM rejects the closure.
pub fn bridge(lua: &Lua, f: HostFn) -> mlua::Result<Function> {
    lua.create_function(move |lua, args: MultiValue| {
        let result = match &f {
            HostFn::Nullary(f) => f(),
            HostFn::Unary(f) => f(string_arg(lua, &args, 0)),
            HostFn::Binary(f) => f(string_arg(lua, &args, 0), string_arg(lua, &args, 1)),
            HostFn::Ternary(f) => f(
                string_arg(lua, &args, 0),
                string_arg(lua, &args, 1),
                string_arg(lua, &args, 2),
            ),
            HostFn::Passthrough(f) => f(args.get(0).map(lua_to_json).unwrap_or(Json::Null)),
        };
        match result {
            Ok(value) => Ok(MultiValue::from_vec(vec![json_to_lua(lua, &value)?])),
            Err(err) => Ok(MultiValue::from_vec(vec![
                Value::Nil,
                Value::String(lua.create_string(err.to_string())?),
            ])),
        }
    })
}

/// Coerce the i-th script argument to a host string; absent or
/// non-coercible arguments become the zero value.
fn string_arg(lua: &Lua, args: &MultiValue, index: usize) -> String {
    args.get(index)
        .and_then(|v| lua.coerce_string(v.clone()).ok().flatten())
        .map(|s| String::from_utf8_lossy(&s.as_bytes()).into_owned())
        .unwrap_or_default()
}
