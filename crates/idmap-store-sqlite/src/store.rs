//! [`SqliteStore`] — the SQLite implementation of [`AccountStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use tracing::debug;

use idmap_core::{Account, AccountStore, Change, Error, Result, fold_id};

use crate::{
  encode::{RawAccount, encode_dt},
  schema::SCHEMA,
};

/// Columns selected for every account read, in `RawAccount` field order.
pub(crate) const COLUMNS: &str =
  "id, profile_id, created_at, last_used_at, last_seen_at, is_registration";

// ─── Store ───────────────────────────────────────────────────────────────────

/// An account store backed by a single SQLite file.
///
/// Uniqueness invariants are delegated to the database's constraint system;
/// violations come back as SQLite extended result codes and are translated
/// into domain errors here. Cloning is cheap — the inner connection is
/// reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path)
      .await
      .map_err(Error::backend)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(Error::backend)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
      .map_err(Error::backend)?;
    debug!("initialised account schema");
    Ok(())
  }
}

/// Translate a failed insert into the domain error its violated constraint
/// stands for: the primary key guards identifier uniqueness, the partial
/// unique index guards registration uniqueness.
fn translate_create_err(err: tokio_rusqlite::Error) -> Error {
  if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, _)) = &err {
    match failure.extended_code {
      rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => return Error::AccountAlreadyExists,
      rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => return Error::ProfileAlreadyRegistered,
      _ => {}
    }
  }
  Error::backend(err)
}

// ─── AccountStore impl ───────────────────────────────────────────────────────

impl AccountStore for SqliteStore {
  async fn create(&self, account: Account) -> Result<()> {
    let folded = fold_id(&account.id);
    let created = encode_dt(account.created);
    let last_used = encode_dt(account.last_used);
    let last_seen = encode_dt(account.last_seen);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO accounts
             (id_folded, id, profile_id, created_at, last_used_at, last_seen_at, is_registration)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            folded,
            account.id,
            account.profile_id,
            created,
            last_used,
            last_seen,
            account.is_registration,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(translate_create_err)
  }

  async fn get(&self, id: &str) -> Result<Account> {
    let folded = fold_id(id);

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {COLUMNS} FROM accounts WHERE id_folded = ?1"),
              rusqlite::params![folded],
              RawAccount::from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(Error::backend)?;

    raw.ok_or(Error::AccountNotFound)?.into_account()
  }

  async fn update(&self, id: &str, change: Change) -> Result<()> {
    if change.is_empty() {
      return Ok(());
    }
    let folded = fold_id(id);

    // One statement covering exactly the fields present in the change.
    // Affecting zero rows satisfies the no-op-on-missing contract without a
    // separate existence check.
    self
      .conn
      .call(move |conn| {
        match (change.last_used, change.last_seen) {
          (Some(used), None) => {
            conn.execute(
              "UPDATE accounts SET last_used_at = ?1 WHERE id_folded = ?2",
              rusqlite::params![encode_dt(used), folded],
            )?;
          }
          (None, Some(seen)) => {
            conn.execute(
              "UPDATE accounts SET last_seen_at = ?1 WHERE id_folded = ?2",
              rusqlite::params![encode_dt(seen), folded],
            )?;
          }
          (Some(used), Some(seen)) => {
            conn.execute(
              "UPDATE accounts SET last_used_at = ?1, last_seen_at = ?2 WHERE id_folded = ?3",
              rusqlite::params![encode_dt(used), encode_dt(seen), folded],
            )?;
          }
          (None, None) => {}
        }
        Ok(())
      })
      .await
      .map_err(Error::backend)
  }

  async fn delete(&self, id: &str) -> Result<()> {
    let folded = fold_id(id);

    // Affecting zero rows is fine: delete is idempotent.
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM accounts WHERE id_folded = ?1",
          rusqlite::params![folded],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::backend)
  }

  async fn list_by_profile(&self, profile_id: &str) -> Result<Vec<Account>> {
    let profile = profile_id.to_owned();

    let raws: Vec<RawAccount> = self
      .conn
      .call(move |conn| {
        // Ordering is pushed down to the database. Timestamps are
        // fixed-width text, so DESC is chronological; `id` breaks ties
        // deterministically.
        let mut stmt = conn.prepare(&format!(
          "SELECT {COLUMNS} FROM accounts WHERE profile_id = ?1
           ORDER BY last_used_at DESC, id ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![profile], RawAccount::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::backend)?;

    raws.into_iter().map(RawAccount::into_account).collect()
  }
}
