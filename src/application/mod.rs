//! Application layer (use-cases, policies).
//!
//! Gate resolution, the web session controller and the native profile store.
//! Everything here talks to storage through the `KeyValueStore` port and to
//! the network or a web view through injected traits.

pub mod gate;
pub mod launch;
pub mod profile;
pub mod session;
