//! Error taxonomy for the account store.

use thiserror::Error;

/// Errors returned by [`AccountStore`](crate::store::AccountStore)
/// operations.
///
/// The first three variants are domain conditions; callers match on them by
/// variant, never by message. [`Backend`](Error::Backend) carries everything
/// else (I/O, connectivity, encoding) opaquely — it is never conflated with
/// a domain condition and never retried inside the store. Retry policy is
/// the caller's.
#[derive(Debug, Error)]
pub enum Error {
  /// No Account matches the requested identifier.
  #[error("account not found")]
  AccountNotFound,

  /// An Account with the same identifier already exists
  /// (identifiers are compared case-insensitively).
  #[error("account already exists")]
  AccountAlreadyExists,

  /// The profile already has an Account flagged as its registration.
  #[error("profile already has a registration account")]
  ProfileAlreadyRegistered,

  /// An opaque backend failure, propagated verbatim.
  #[error("backend failure: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
  /// Wrap a backend-native error.
  pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
    Self::Backend(err.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
