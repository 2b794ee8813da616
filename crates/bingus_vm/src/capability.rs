//! Capability registry: the translation table from claim strings to
//! script-visible bindings.
//!
//! Three tables live here: the always-on set injected into every VM, the
//! flat-claim set, and the parameterised `log` family whose factory bakes
//! the claimed namespace into both the on-disk directory and the Lua
//! global table name.

use crate::bridge::{bridge, HostFn};
use crate::builtins;
use bingus_core::{Claim, FlatClaim, LogVerb};
use bingus_log::LogStore;
use mlua::{Lua, Table, Value};
use serde_json::Value as Json;
use std::path::PathBuf;

/// A script-visible function: `<namespace>.<name>(...)`
pub struct Binding {
    /// Global table the function is installed into
    pub namespace: String,
    /// Function field name within the table
    pub name: &'static str,
    /// The host implementation
    pub func: HostFn,
}

impl Binding {
    fn new(namespace: &str, name: &'static str, func: HostFn) -> Self {
        Self {
            namespace: namespace.to_string(),
            name,
            func,
        }
    }
}

/// Process-wide capability tables, built once at startup.
///
/// The log root is resolved at construction so every invocation shares the
/// same storage location; tests construct a registry over a scratch root.
#[derive(Debug)]
pub struct CapabilityRegistry {
    log_root: PathBuf,
}

impl CapabilityRegistry {
    /// Build a registry storing logs under `<home>/.bingus/logs`.
    ///
    /// # Errors
    ///
    /// Returns an error when no home directory can be resolved.
    pub fn new() -> Result<Self, bingus_log::LogError> {
        Ok(Self {
            log_root: bingus_log::default_root()?,
        })
    }

    /// Build a registry over an explicit log root.
    #[must_use]
    pub fn with_log_root(log_root: PathBuf) -> Self {
        Self { log_root }
    }

    /// Bindings injected into every VM regardless of claims.
    #[must_use]
    pub fn always_on(&self) -> Vec<Binding> {
        vec![
            Binding::new("time", "now", HostFn::nullary(builtins::time_now)),
            Binding::new("time", "unix", HostFn::nullary(builtins::time_unix)),
            Binding::new("json", "encode", HostFn::passthrough(builtins::json_encode)),
            Binding::new("json", "decode", HostFn::unary(builtins::json_decode)),
        ]
    }

    /// Bindings granted by one claim. Unknown claims produce no bindings;
    /// validating them is the registry loader's responsibility.
    #[must_use]
    pub fn bindings_for(&self, claim: &str) -> Vec<Binding> {
        let Ok(claim) = Claim::parse(claim) else {
            return Vec::new();
        };
        match claim {
            Claim::Flat(flat) => vec![Self::flat_binding(flat)],
            Claim::Log { verb, namespace } => vec![self.log_binding(verb, namespace)],
        }
    }

    fn flat_binding(flat: FlatClaim) -> Binding {
        match flat {
            FlatClaim::HttpGet => Binding::new("http", "get", HostFn::unary(builtins::http_get)),
            FlatClaim::HttpPost => {
                Binding::new("http", "post", HostFn::ternary(builtins::http_post))
            }
            FlatClaim::FsRead => Binding::new("fs", "read", HostFn::unary(builtins::fs_read)),
            FlatClaim::FsWrite => Binding::new("fs", "write", HostFn::binary(builtins::fs_write)),
            FlatClaim::FsList => Binding::new("fs", "list", HostFn::unary(builtins::fs_list)),
        }
    }

    /// Manufacture one log verb scoped to its namespace. The store opens on
    /// each call, creating the namespace directory on first use.
    fn log_binding(&self, verb: LogVerb, namespace: String) -> Binding {
        let root = self.log_root.clone();
        match verb {
            LogVerb::Append => {
                let ns = namespace.clone();
                Binding::new(
                    &namespace,
                    "append",
                    HostFn::passthrough(move |entry| {
                        let store = LogStore::open(&root, &ns)?;
                        Ok(Json::String(store.append(entry)?))
                    }),
                )
            }
            LogVerb::Query => {
                let ns = namespace.clone();
                Binding::new(
                    &namespace,
                    "query",
                    HostFn::binary(move |since, text| {
                        let store = LogStore::open(&root, &ns)?;
                        Ok(Json::String(store.query(&since, &text)?))
                    }),
                )
            }
        }
    }

    /// Install every binding granted by a claim into a VM. A no-op for
    /// unknown claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the VM rejects a table or function.
    pub fn install_claim(&self, lua: &Lua, claim: &str) -> mlua::Result<()> {
        for binding in self.bindings_for(claim) {
            install(lua, binding)?;
        }
        Ok(())
    }

    /// Install the always-on bindings into a VM.
    ///
    /// # Errors
    ///
    /// Returns an error if the VM rejects a table or function.
    pub fn install_always_on(&self, lua: &Lua) -> mlua::Result<()> {
        for binding in self.always_on() {
            install(lua, binding)?;
        }
        Ok(())
    }
}

/// Install one binding: ensure the namespace global exists, set the field.
///
/// # Errors
///
/// Returns an error if the VM rejects the table or function.
pub fn install(lua: &Lua, binding: Binding) -> mlua::Result<()> {
    let table = ensure_table(lua, &binding.namespace)?;
    table.set(binding.name, bridge(lua, binding.func)?)
}

/// Get or create a named global table.
fn ensure_table(lua: &Lua, name: &str) -> mlua::Result<Table> {
    let globals = lua.globals();
    if let Value::Table(existing) = globals.get::<Value>(name)? {
        return Ok(existing);
    }
    let table = lua.create_table()?;
    globals.set(name, &table)?;
    Ok(table)
}
