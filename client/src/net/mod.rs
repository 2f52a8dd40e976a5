//! Networking modules for the cookie bridge and the backend auth API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `bridge` deduplicates and orders cookie synchronization, `transport`
//! performs the same-origin bridge calls, and `api` talks to the backend that
//! issues tokens.

pub mod api;
pub mod bridge;
pub mod transport;

#[cfg(test)]
#[path = "backend_stub.rs"]
pub(crate) mod backend_stub;
