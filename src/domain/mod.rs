//! Domain types for Pathways
//! Gate decisions, persisted gate state, session cookies and the native profile.

pub mod cookie;
pub mod error;
pub mod gate;
pub mod profile;

pub use cookie::*;
pub use error::*;
pub use gate::*;
pub use profile::*;
