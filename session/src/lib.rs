//! Shared session model for the storefront gate.
//!
//! This crate owns the pieces that both the page-side `client` and the
//! edge-side `server` must agree on: the claim decoder, the auth state shape,
//! the payload that crosses the cookie bridge, the cookie names, and the
//! access policy. Nothing here performs I/O.

pub mod claims;
pub mod cookies;
pub mod policy;
pub mod state;

pub use policy::{AccessVerdict, decide};
pub use state::{AuthState, Role, SessionPayload, TokenGrant};
