//! Sandbox construction: a fresh VM with dangerous globals stripped and
//! capabilities injected according to the tool's claims.

use crate::capability::CapabilityRegistry;
use mlua::{Lua, Value};

/// Globals blanked out of every tool VM.
///
/// The full standard library is opened and known-dangerous entries are then
/// deleted; this deny-list approach is safer than additive library openers,
/// which do not register globals identically to the full loader. The
/// sandbox completeness test enumerates every surviving global, so an
/// incomplete deny-list fails loudly.
///
/// `coroutine`, `utf8` and `warn` cover Lua 5.4's additions beyond the
/// closed `math`/`string`/`table` surface; `bit32` stays for runtimes that
/// still ship it.
pub const DENY_LIST: &[&str] = &[
    // dangerous libraries
    "os", "io", "debug", "package", "bit32", "coroutine", "utf8",
    // dangerous base globals
    "dofile", "loadfile", "print", "require", "warn",
];

/// A per-invocation Lua VM. Dropping the sandbox discards the VM and every
/// host resource tied to it; VMs are never reused across invocations.
pub struct Sandbox {
    lua: Lua,
}

impl Sandbox {
    /// Build a VM for the given claim set.
    ///
    /// Unknown claims install nothing; validation happens at registry load.
    ///
    /// # Errors
    ///
    /// Returns an error if capability injection fails.
    pub fn new(claims: &[String], caps: &CapabilityRegistry) -> mlua::Result<Self> {
        let lua = Lua::new();

        let globals = lua.globals();
        for name in DENY_LIST {
            globals.set(*name, Value::Nil)?;
        }
        drop(globals);

        caps.install_always_on(&lua)?;
        for claim in claims {
            caps.install_claim(&lua, claim)?;
        }

        tracing::debug!(claims = claims.len(), "sandbox constructed");
        Ok(Self { lua })
    }

    /// The underlying VM handle.
    #[must_use]
    pub fn lua(&self) -> &Lua {
        &self.lua
    }
}
