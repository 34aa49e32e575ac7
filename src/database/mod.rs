//! Vidmarks persistence layer.
//!
//! Provides SQLite connection management, schema migrations and the
//! whole-value key-value stores bookmark lists live in.
//!
//! # Usage
//!
//! ```no_run
//! use vidmarks::database::{KeyValueStore, SqliteKvStore};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteKvStore::open("vidmarks.db")?;
//! let values = store.get(&["abc123"]).await?;
//! # let _ = values;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod kv_store;
pub mod migrations;

pub use connection::Database;
pub use kv_store::{KeyValueStore, MemoryKvStore, SqliteKvStore, StorageChange};
