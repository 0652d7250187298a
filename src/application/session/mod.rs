//! Persistent web session: navigation state machine, cookie persistence and
//! the ports it needs from a hosting web surface.

pub mod controller;
pub mod cookies;
pub mod surface;

pub use controller::{
    NavigationEvent, NavigationState, SessionSettings, WebSessionController, user_agent,
};
pub use cookies::{CookieSnapshotSlot, CookieStore};
pub use surface::{LoadRequest, WebSurface};
