//! Vidmarks: timestamp bookmarks for web video pages.
//!
//! Persistence and synchronization of per-video bookmark lists across the
//! page-embedded component, the companion panel and the background
//! coordinator. This library crate exposes all modules for use by the host
//! binary and integration tests.

pub mod app;
pub mod database;
pub mod logging;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
