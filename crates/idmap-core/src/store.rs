//! The `AccountStore` trait — the contract every storage backend satisfies.
//!
//! Backends (`idmap-store-memory`, `idmap-store-sqlite`, `idmap-store-lmdb`)
//! implement this trait; consumers depend on the abstraction and select a
//! concrete backend by configuration.

use std::future::Future;

use crate::{
  account::{Account, Change},
  error::Result,
};

/// Abstraction over an Account storage backend.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes (e.g. tokio behind an HTTP surface).
///
/// Every operation executes as a single transaction against the backing
/// store: dropping a returned future before completion never leaves a
/// partially applied write behind. Concurrent operations on the same
/// identifier serialize; each sees a fully applied prior state.
pub trait AccountStore: Send + Sync {
  /// Insert a new Account.
  ///
  /// Fails with [`AccountAlreadyExists`](crate::Error::AccountAlreadyExists)
  /// if the identifier is already taken (case-insensitively), leaving the
  /// existing Account untouched. Fails with
  /// [`ProfileAlreadyRegistered`](crate::Error::ProfileAlreadyRegistered)
  /// if `account.is_registration` is set and the profile already has a
  /// registration Account. On success the Account is durably visible to
  /// subsequent [`get`](Self::get)/[`list_by_profile`](Self::list_by_profile)
  /// calls from any caller.
  fn create(&self, account: Account) -> impl Future<Output = Result<()>> + Send + '_;

  /// Retrieve the Account matching `id` (case-insensitively).
  ///
  /// Fails with [`AccountNotFound`](crate::Error::AccountNotFound) if no
  /// Account matches.
  fn get<'a>(&'a self, id: &'a str) -> impl Future<Output = Result<Account>> + Send + 'a;

  /// Apply `change` to the Account matching `id`.
  ///
  /// A missing Account is deliberately *not* an error: updates race
  /// deletions, and the loser should not surface a failure. An empty
  /// change is likewise a no-op that leaves stored fields byte-for-byte
  /// unchanged. `id`, `profile_id`, `created`, and `is_registration` are
  /// never touched by an update.
  fn update<'a>(
    &'a self,
    id: &'a str,
    change: Change,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Remove the Account matching `id`.
  ///
  /// Deleting an Account that does not exist is not an error (idempotent
  /// delete). Other Accounts sharing the profile are never affected.
  fn delete<'a>(&'a self, id: &'a str) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Return every Account belonging to `profile_id` (matched exactly,
  /// case-sensitively), most recently used first. Ties are deterministic
  /// within a backend but the tie-break rule is not part of the contract.
  /// An unknown profile yields an empty list, not an error.
  fn list_by_profile<'a>(
    &'a self,
    profile_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Account>>> + Send + 'a;
}
