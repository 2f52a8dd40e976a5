//! Client-side session state.
//!
//! DESIGN
//! ======
//! `auth` holds the credential cache, `persistence` the single storage medium
//! it mirrors into, and `identity` the read-only projection the rendering
//! layer consumes.

pub mod auth;
pub mod identity;
pub mod persistence;
