//! # pedsage-store
//!
//! Durable storage for pedsage.
//!
//! The memory layer persists its whole state as one string blob under a
//! fixed key, so the storage contract is deliberately narrow: [`KvStore`]
//! with get/set/delete. Two implementations ship here:
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  KvStore (trait)                         │
//! ├────────────────────┬─────────────────────┤
//! │  SqliteKvStore     │  InMemoryKvStore    │
//! │  (kv_store table)  │  (HashMap)          │
//! ├────────────────────┴─────────────────────┤
//! │  Database (rusqlite WAL, blocking pool)  │
//! │  Migrations (versioned, transactional)   │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use pedsage_store::{Database, KvStore, SqliteKvStore};
//!
//! let db = Database::open_and_migrate("data/pedsage.db").await?;
//! let kv = SqliteKvStore::new(db);
//! kv.set("greeting", "hello").await?;
//! ```

pub mod db;
pub mod error;
pub mod kv;
pub mod migration;

// ── re-exports ───────────────────────────────────────────────────────

pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use kv::{InMemoryKvStore, KvStore, SqliteKvStore};
