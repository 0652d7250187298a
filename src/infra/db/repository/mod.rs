//! Repository implementations for data access in Pathways.
//!
//! Provides the SQLite-backed key-value store behind the storage port.

mod kv;

pub use kv::SqliteKeyValueStore;

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub type DbConn = Arc<Mutex<Connection>>;

#[cfg(test)]
mod tests;
