//! Core types and trait definitions for the idmap account store.
//!
//! idmap maps user-facing login identifiers (email addresses, usernames,
//! whatever) to an opaque, stable profile ID, so one logical user can own
//! several interchangeable identifiers. This crate holds the record model,
//! the error taxonomy, and the [`AccountStore`] contract; it is deliberately
//! free of any database dependency. Concrete backends live in their own
//! crates (`idmap-store-memory`, `idmap-store-sqlite`, `idmap-store-lmdb`)
//! and consumers depend on the abstraction, not on any of them.

pub mod account;
pub mod error;
pub mod store;

#[cfg(feature = "conformance")]
pub mod conformance;

pub use account::{Account, Change, by_last_used_desc, fold_id};
pub use error::{Error, Result};
pub use store::AccountStore;
