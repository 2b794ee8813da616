//! BINGUS Tool System
//!
//! Tool metadata extraction, the immutable tool registry, and the
//! function-calling schema export. Tool scripts are treated as potentially
//! hostile: metadata is read in a throwaway VM and execution always goes
//! through the sandbox.

#![warn(clippy::all)]

pub mod definition;
pub mod extract;
pub mod registry;

pub use definition::ToolDef;
pub use extract::{extract, ExtractError};
pub use registry::{CallError, FunctionDecl, FunctionExport, RegistryError, ToolRegistry};
