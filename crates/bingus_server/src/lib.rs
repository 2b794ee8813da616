//! BINGUS Server
//!
//! HTTP adapter for the tool registry: schema listing and tool invocation
//! for function-calling clients.

#![warn(clippy::all)]

pub mod api;

pub use api::{router, CallRequest, CallResponse};
