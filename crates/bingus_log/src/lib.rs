//! BINGUS Log Store
//!
//! Append-only JSONL logs, one directory per namespace, one file per UTC
//! calendar day. Entries are free-form JSON objects; the store owns the
//! reserved `id` and `createdAt` fields.

#![warn(clippy::all)]

pub mod since;
pub mod store;

pub use since::parse_since;
pub use store::{default_root, LogError, LogStore};
