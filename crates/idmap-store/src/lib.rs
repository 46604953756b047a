//! Backend selection for the idmap account store.
//!
//! A deployment runs exactly one backend, chosen by configuration at
//! startup — never by runtime type inspection. [`StoreConfig`] deserializes
//! from any serde source (a TOML config file, layered environment
//! variables, ...) and [`Store::open`] builds the selected backend behind a
//! single value implementing [`AccountStore`].

use std::path::PathBuf;

use serde::Deserialize;

use idmap_core::{Account, AccountStore, Change, Result};
use idmap_store_lmdb::LmdbStore;
use idmap_store_memory::MemoryStore;
use idmap_store_sqlite::SqliteStore;

/// Which backend to run, and where it keeps its data.
///
/// ```toml
/// backend = "sqlite"
/// path    = "/var/lib/idmap/accounts.db"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
  /// In-process memory; nothing survives a restart.
  Memory,
  /// A single SQLite database file.
  Sqlite { path: PathBuf },
  /// An LMDB environment directory.
  Lmdb { path: PathBuf },
}

/// The configured account store — one variant per backend.
///
/// Selection happens exactly once, in [`Store::open`]; afterwards every
/// operation dispatches statically through the enum.
pub enum Store {
  Memory(MemoryStore),
  Sqlite(SqliteStore),
  Lmdb(LmdbStore),
}

impl Store {
  /// Open the backend named by `config`.
  pub async fn open(config: StoreConfig) -> Result<Self> {
    match config {
      StoreConfig::Memory => Ok(Self::Memory(MemoryStore::new())),
      StoreConfig::Sqlite { path } => Ok(Self::Sqlite(SqliteStore::open(path).await?)),
      StoreConfig::Lmdb { path } => Ok(Self::Lmdb(LmdbStore::open(path).await?)),
    }
  }
}

impl AccountStore for Store {
  async fn create(&self, account: Account) -> Result<()> {
    match self {
      Self::Memory(store) => store.create(account).await,
      Self::Sqlite(store) => store.create(account).await,
      Self::Lmdb(store) => store.create(account).await,
    }
  }

  async fn get(&self, id: &str) -> Result<Account> {
    match self {
      Self::Memory(store) => store.get(id).await,
      Self::Sqlite(store) => store.get(id).await,
      Self::Lmdb(store) => store.get(id).await,
    }
  }

  async fn update(&self, id: &str, change: Change) -> Result<()> {
    match self {
      Self::Memory(store) => store.update(id, change).await,
      Self::Sqlite(store) => store.update(id, change).await,
      Self::Lmdb(store) => store.update(id, change).await,
    }
  }

  async fn delete(&self, id: &str) -> Result<()> {
    match self {
      Self::Memory(store) => store.delete(id).await,
      Self::Sqlite(store) => store.delete(id).await,
      Self::Lmdb(store) => store.delete(id).await,
    }
  }

  async fn list_by_profile(&self, profile_id: &str) -> Result<Vec<Account>> {
    match self {
      Self::Memory(store) => store.list_by_profile(profile_id).await,
      Self::Sqlite(store) => store.list_by_profile(profile_id).await,
      Self::Lmdb(store) => store.list_by_profile(profile_id).await,
    }
  }
}

#[cfg(test)]
mod tests {
  use idmap_core::conformance;

  use super::*;

  #[test]
  fn config_deserializes_memory() {
    let config: StoreConfig =
      serde_json::from_str(r#"{"backend": "memory"}"#).expect("deserialize config");
    assert_eq!(config, StoreConfig::Memory);
  }

  #[test]
  fn config_deserializes_paths() {
    let config: StoreConfig =
      serde_json::from_str(r#"{"backend": "sqlite", "path": "/var/lib/idmap/accounts.db"}"#)
        .expect("deserialize config");
    assert_eq!(
      config,
      StoreConfig::Sqlite { path: "/var/lib/idmap/accounts.db".into() }
    );

    let config: StoreConfig =
      serde_json::from_str(r#"{"backend": "lmdb", "path": "/var/lib/idmap"}"#)
        .expect("deserialize config");
    assert_eq!(config, StoreConfig::Lmdb { path: "/var/lib/idmap".into() });
  }

  #[test]
  fn unknown_backend_is_rejected() {
    assert!(serde_json::from_str::<StoreConfig>(r#"{"backend": "dynamo"}"#).is_err());
  }

  #[tokio::test]
  async fn open_dispatches_to_each_backend() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let configs = [
      StoreConfig::Memory,
      StoreConfig::Sqlite { path: dir.path().join("accounts.db") },
      StoreConfig::Lmdb { path: dir.path().join("lmdb") },
    ];

    for config in configs {
      let store = Store::open(config).await.expect("open store");
      let acct = conformance::account("paddy@example.com", "profile-1");
      store.create(acct.clone()).await.expect("create account");
      let got = store.get(&acct.id).await.expect("get account");
      assert_eq!(got, acct);
    }
  }
}
