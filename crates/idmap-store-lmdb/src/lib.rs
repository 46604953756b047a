//! LMDB backend for the idmap account store.
//!
//! The document-store backend: Accounts are JSON documents keyed directly
//! by their (case-folded) identifier, so identifier uniqueness rides on the
//! store's atomic insert-if-absent primitive. Registration uniqueness has
//! no such primitive and is checked in application code inside the write
//! transaction, and `ListByProfile` goes through a secondary index with the
//! ordering applied in application code.

mod store;

pub use store::LmdbStore;

#[cfg(test)]
mod tests;
