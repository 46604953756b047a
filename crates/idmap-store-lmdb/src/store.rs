//! [`LmdbStore`] — the document-store implementation of [`AccountStore`].

use std::path::Path;

use heed::{Database, Env, EnvOpenOptions, MdbError, PutFlags, types::Bytes};
use tracing::debug;

use idmap_core::{Account, AccountStore, Change, Error, Result, by_last_used_desc, fold_id};

/// 1 GiB of address space; LMDB only commits pages actually written.
const MAP_SIZE: usize = 1 << 30;

/// Separator between the profile ID and the folded identifier in secondary
/// index keys. Identifiers and profile IDs never contain NUL.
const INDEX_SEP: u8 = 0;

// ─── Encoding ────────────────────────────────────────────────────────────────

fn encode_account(account: &Account) -> Result<Vec<u8>> {
  serde_json::to_vec(account).map_err(Error::backend)
}

fn decode_account(doc: &[u8]) -> Result<Account> {
  serde_json::from_slice(doc).map_err(Error::backend)
}

/// `profile_id NUL folded_id` — one index entry per account.
fn index_key(profile_id: &str, folded_id: &str) -> Vec<u8> {
  let mut key = Vec::with_capacity(profile_id.len() + 1 + folded_id.len());
  key.extend_from_slice(profile_id.as_bytes());
  key.push(INDEX_SEP);
  key.extend_from_slice(folded_id.as_bytes());
  key
}

/// The separator keeps `p1` from matching `p10` in a prefix scan.
fn index_prefix(profile_id: &str) -> Vec<u8> {
  let mut prefix = Vec::with_capacity(profile_id.len() + 1);
  prefix.extend_from_slice(profile_id.as_bytes());
  prefix.push(INDEX_SEP);
  prefix
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An account store backed by an LMDB environment.
///
/// Every operation is one LMDB transaction: committed whole or unwound.
/// LMDB transactions are synchronous, so operations run on the blocking
/// pool to keep them off the async runtime. Cloning is cheap — the
/// environment handle is reference-counted and database handles are plain
/// indices.
#[derive(Clone)]
pub struct LmdbStore {
  env: Env,
  /// Folded identifier → JSON-encoded Account document.
  accounts: Database<Bytes, Bytes>,
  /// `profile_id NUL folded_id` → folded identifier.
  profiles: Database<Bytes, Bytes>,
}

impl LmdbStore {
  /// Open (or create) a store under the `path` directory.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_owned();
    tokio::task::spawn_blocking(move || {
      std::fs::create_dir_all(&path).map_err(Error::backend)?;
      // heed's contract: at most one environment per path per process.
      let env = unsafe {
        EnvOpenOptions::new()
          .map_size(MAP_SIZE)
          .max_dbs(2)
          .open(&path)
          .map_err(Error::backend)?
      };

      let mut wtxn = env.write_txn().map_err(Error::backend)?;
      let accounts = env
        .create_database::<Bytes, Bytes>(&mut wtxn, Some("accounts"))
        .map_err(Error::backend)?;
      let profiles = env
        .create_database::<Bytes, Bytes>(&mut wtxn, Some("profiles"))
        .map_err(Error::backend)?;
      wtxn.commit().map_err(Error::backend)?;

      debug!(path = %path.display(), "opened account store");
      Ok(Self { env, accounts, profiles })
    })
    .await
    .map_err(Error::backend)?
  }

  /// Run `op` on the blocking pool with a clone of the store handles.
  async fn blocking<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(Self) -> Result<T> + Send + 'static,
  {
    let store = self.clone();
    tokio::task::spawn_blocking(move || op(store))
      .await
      .map_err(Error::backend)?
  }

  /// True if any account under `profile_id` carries the registration flag.
  /// Scans the profile index and fetches the referenced documents.
  fn profile_has_registration(&self, txn: &heed::RoTxn<'_>, profile_id: &str) -> Result<bool> {
    let prefix = index_prefix(profile_id);
    for entry in self
      .profiles
      .prefix_iter(txn, prefix.as_slice())
      .map_err(Error::backend)?
    {
      let (_, folded_id) = entry.map_err(Error::backend)?;
      if let Some(doc) = self.accounts.get(txn, folded_id).map_err(Error::backend)? {
        if decode_account(doc)?.is_registration {
          return Ok(true);
        }
      }
    }
    Ok(false)
  }
}

// ─── AccountStore impl ───────────────────────────────────────────────────────

impl AccountStore for LmdbStore {
  async fn create(&self, account: Account) -> Result<()> {
    self
      .blocking(move |store| {
        let key = fold_id(&account.id);
        let doc = encode_account(&account)?;
        let mut wtxn = store.env.write_txn().map_err(Error::backend)?;

        // The put is itself the uniqueness check: NO_OVERWRITE refuses to
        // replace an existing document.
        match store
          .accounts
          .put_with_flags(&mut wtxn, PutFlags::NO_OVERWRITE, key.as_bytes(), &doc)
        {
          Ok(()) => {}
          Err(heed::Error::Mdb(MdbError::KeyExist)) => return Err(Error::AccountAlreadyExists),
          Err(err) => return Err(Error::backend(err)),
        }

        // The index entry for this account is written below, so the scan
        // sees only pre-existing accounts. Returning early unwinds the put
        // above along with the transaction.
        if account.is_registration
          && store.profile_has_registration(&wtxn, &account.profile_id)?
        {
          return Err(Error::ProfileAlreadyRegistered);
        }

        store
          .profiles
          .put(&mut wtxn, &index_key(&account.profile_id, &key), key.as_bytes())
          .map_err(Error::backend)?;
        wtxn.commit().map_err(Error::backend)?;
        Ok(())
      })
      .await
  }

  async fn get(&self, id: &str) -> Result<Account> {
    let key = fold_id(id);
    self
      .blocking(move |store| {
        let rtxn = store.env.read_txn().map_err(Error::backend)?;
        let doc = store
          .accounts
          .get(&rtxn, key.as_bytes())
          .map_err(Error::backend)?;
        doc.map(decode_account).transpose()?.ok_or(Error::AccountNotFound)
      })
      .await
  }

  async fn update(&self, id: &str, change: Change) -> Result<()> {
    if change.is_empty() {
      return Ok(());
    }
    let key = fold_id(id);
    self
      .blocking(move |store| {
        // Read-modify-write under one transaction. An absent document means
        // the update lost a race with a delete; commit nothing.
        let mut wtxn = store.env.write_txn().map_err(Error::backend)?;
        let Some(doc) = store
          .accounts
          .get(&wtxn, key.as_bytes())
          .map_err(Error::backend)?
        else {
          return Ok(());
        };

        let updated = change.apply(decode_account(doc)?);
        let doc = encode_account(&updated)?;
        store
          .accounts
          .put(&mut wtxn, key.as_bytes(), &doc)
          .map_err(Error::backend)?;
        wtxn.commit().map_err(Error::backend)?;
        Ok(())
      })
      .await
  }

  async fn delete(&self, id: &str) -> Result<()> {
    let key = fold_id(id);
    self
      .blocking(move |store| {
        let mut wtxn = store.env.write_txn().map_err(Error::backend)?;
        // The document carries the profile ID needed to drop the index
        // entry; a missing document makes the delete a committed no-op.
        let Some(doc) = store
          .accounts
          .get(&wtxn, key.as_bytes())
          .map_err(Error::backend)?
        else {
          return Ok(());
        };

        let account = decode_account(doc)?;
        store
          .accounts
          .delete(&mut wtxn, key.as_bytes())
          .map_err(Error::backend)?;
        store
          .profiles
          .delete(&mut wtxn, &index_key(&account.profile_id, &key))
          .map_err(Error::backend)?;
        wtxn.commit().map_err(Error::backend)?;
        Ok(())
      })
      .await
  }

  async fn list_by_profile(&self, profile_id: &str) -> Result<Vec<Account>> {
    let profile = profile_id.to_owned();
    self
      .blocking(move |store| {
        let rtxn = store.env.read_txn().map_err(Error::backend)?;

        // Keys first, then the full documents — the index stores only
        // identifiers.
        let prefix = index_prefix(&profile);
        let mut keys = Vec::new();
        for entry in store
          .profiles
          .prefix_iter(&rtxn, prefix.as_slice())
          .map_err(Error::backend)?
        {
          let (_, folded_id) = entry.map_err(Error::backend)?;
          keys.push(folded_id.to_vec());
        }
        debug!(profile_id = %profile, matches = keys.len(), "scanned profile index");

        let mut accounts = Vec::with_capacity(keys.len());
        for key in keys {
          let doc = store
            .accounts
            .get(&rtxn, &key)
            .map_err(Error::backend)?
            .ok_or_else(|| {
              Error::backend(format!(
                "profile index points at missing document {:?}",
                String::from_utf8_lossy(&key)
              ))
            })?;
          accounts.push(decode_account(doc)?);
        }

        // No push-down ordering on this index; sort here. The index scan
        // is key-ordered, so ties stay deterministic.
        by_last_used_desc(&mut accounts);
        Ok(accounts)
      })
      .await
  }
}
