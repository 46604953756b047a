//! [`MemoryStore`] — the in-memory implementation of [`AccountStore`].

use std::{
  collections::{BTreeMap, BTreeSet},
  sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use tracing::debug;

use idmap_core::{Account, AccountStore, Change, Error, Result, by_last_used_desc, fold_id};

// ─── Indexes ─────────────────────────────────────────────────────────────────

/// The two logical indexes over the account set.
///
/// A write guard on the containing lock is the transaction: every mutation
/// validates first and then updates both maps or neither, so the indexes
/// can never drift apart.
#[derive(Default)]
struct Tables {
  /// Unique index: folded identifier → Account (stored with the casing it
  /// was created with).
  by_id: BTreeMap<String, Account>,

  /// Non-unique index: profile ID → folded identifiers. Ordered maps keep
  /// scan order, and therefore list tie-breaking, deterministic.
  by_profile: BTreeMap<String, BTreeSet<String>>,
}

impl Tables {
  fn insert(&mut self, key: String, account: Account) {
    self
      .by_profile
      .entry(account.profile_id.clone())
      .or_default()
      .insert(key.clone());
    self.by_id.insert(key, account);
  }

  fn remove(&mut self, key: &str) {
    if let Some(account) = self.by_id.remove(key) {
      if let Some(ids) = self.by_profile.get_mut(&account.profile_id) {
        ids.remove(key);
        if ids.is_empty() {
          self.by_profile.remove(&account.profile_id);
        }
      }
    }
  }

  /// True if any account under `profile_id` carries the registration flag.
  fn has_registration(&self, profile_id: &str) -> bool {
    self.by_profile.get(profile_id).is_some_and(|ids| {
      ids
        .iter()
        .any(|id| self.by_id.get(id).is_some_and(|a| a.is_registration))
    })
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An account store held entirely in process memory.
///
/// Mutations hold the write guard for the duration of one indexed
/// transaction; readers hold the read guard for a single lookup and never
/// observe a half-applied write.
#[derive(Default)]
pub struct MemoryStore {
  tables: RwLock<Tables>,
}

impl MemoryStore {
  /// An empty store, ready for use.
  pub fn new() -> Self {
    Self::default()
  }

  fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
    self
      .tables
      .read()
      .map_err(|_| Error::backend("account indexes poisoned by a panicking writer"))
  }

  fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
    self
      .tables
      .write()
      .map_err(|_| Error::backend("account indexes poisoned by a panicking writer"))
  }
}

impl AccountStore for MemoryStore {
  async fn create(&self, account: Account) -> Result<()> {
    let key = fold_id(&account.id);
    let mut tables = self.write()?;
    if tables.by_id.contains_key(&key) {
      return Err(Error::AccountAlreadyExists);
    }
    if account.is_registration && tables.has_registration(&account.profile_id) {
      return Err(Error::ProfileAlreadyRegistered);
    }
    tables.insert(key, account);
    Ok(())
  }

  async fn get(&self, id: &str) -> Result<Account> {
    self
      .read()?
      .by_id
      .get(&fold_id(id))
      .cloned()
      .ok_or(Error::AccountNotFound)
  }

  async fn update(&self, id: &str, change: Change) -> Result<()> {
    if change.is_empty() {
      return Ok(());
    }
    let mut tables = self.write()?;
    // A missing account is a no-op, not an error: updates race deletions.
    if let Some(account) = tables.by_id.get_mut(&fold_id(id)) {
      *account = change.apply(account.clone());
    }
    Ok(())
  }

  async fn delete(&self, id: &str) -> Result<()> {
    self.write()?.remove(&fold_id(id));
    Ok(())
  }

  async fn list_by_profile(&self, profile_id: &str) -> Result<Vec<Account>> {
    let tables = self.read()?;
    let mut accounts: Vec<Account> = tables
      .by_profile
      .get(profile_id)
      .into_iter()
      .flatten()
      .filter_map(|id| tables.by_id.get(id).cloned())
      .collect();
    drop(tables);

    debug!(profile_id, matches = accounts.len(), "scanned profile index");
    by_last_used_desc(&mut accounts);
    Ok(accounts)
  }
}
