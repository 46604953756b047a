//! In-memory backend for the idmap account store.
//!
//! Transactional, indexed, and concurrency-safe with no I/O at all — used
//! by tests and lightweight single-process deployments. Nothing survives a
//! restart.

mod store;

pub use store::MemoryStore;

#[cfg(test)]
mod tests;
