//! quizcast adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `store`: SQLite draft, cursor and user store
//! - `llm`: content generators (Gemini, stub)
//! - `telegram`: channel publisher, operator notifier and bot surface
//! - `outbox`: JSONL publisher/notifier for dry runs

pub mod outbox;
mod store_sqlite;

pub mod llm;
pub mod telegram;

/// Re-exports for store adapters
pub mod store {
    pub use crate::store_sqlite::SqliteContentStore;
}
