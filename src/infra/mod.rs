//! Infrastructure layer (adapters/implementations).
//!
//! This module contains IO-heavy integrations (SQLite, HTTP, OS probing).

pub mod app_config;
pub mod cookie_jar;
pub mod db;
pub mod device;
pub mod gate_client;
pub mod platform;
pub mod storage;
pub mod web_surface;
