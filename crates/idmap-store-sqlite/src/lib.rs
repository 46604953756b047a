//! SQLite backend for the idmap account store.
//!
//! The relational backend: uniqueness invariants are enforced by database
//! constraints rather than application code, and constraint violations are
//! translated back into domain errors. Wraps [`tokio_rusqlite`] so database
//! access runs on a dedicated thread without blocking the async runtime.

mod encode;
mod schema;
mod store;

pub use store::SqliteStore;

#[cfg(test)]
mod tests;
