//! BINGUS Sandboxed VM
//!
//! One fresh Lua VM per tool invocation: the full standard library is opened,
//! dangerous globals are stripped by deny-list, and only the builtins
//! authorised by the tool's capability claims are injected back in. Host
//! values cross the boundary through a single marshalling layer; host
//! functions cross it through a single bridge.

#![warn(clippy::all)]

pub mod bridge;
pub mod builtins;
pub mod capability;
pub mod convert;
pub mod invoke;
pub mod sandbox;

pub use bridge::{HostError, HostFn, HostResult};
pub use capability::{Binding, CapabilityRegistry};
pub use convert::{json_to_lua, lua_to_json};
pub use invoke::{run_tool, InvokeError};
pub use sandbox::{Sandbox, DENY_LIST};
