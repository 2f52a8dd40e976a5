//! # client
//!
//! Page-side half of the storefront session gate. Owns the credential cache
//! the rendering layer reads, the identity projection derived from it, and the
//! cookie bridge that mirrors credentials into cookies the edge interceptor
//! can see.
//!
//! [`manager::SessionManager`] is the composition root: it owns one store,
//! one projector, and one bridge, and runs the sign-in, refresh, and sign-out
//! flows against them.

pub mod manager;
pub mod net;
pub mod state;

pub use manager::SessionManager;
