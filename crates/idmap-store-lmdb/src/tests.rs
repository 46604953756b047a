//! Tests for `LmdbStore`: the shared contract checks against a throwaway
//! environment, plus on-disk behavior.

use idmap_core::{Account, AccountStore, Change, Result, conformance};

use crate::LmdbStore;

/// A store plus the temp directory that owns its files; keeps the
/// environment alive for the duration of one test.
struct TempStore {
  store: LmdbStore,
  _dir:  tempfile::TempDir,
}

async fn temp_store() -> TempStore {
  let dir = tempfile::tempdir().expect("create temp dir");
  let store = LmdbStore::open(dir.path().join("idmap")).await.expect("open store");
  TempStore { store, _dir: dir }
}

impl AccountStore for TempStore {
  async fn create(&self, account: Account) -> Result<()> {
    self.store.create(account).await
  }

  async fn get(&self, id: &str) -> Result<Account> {
    self.store.get(id).await
  }

  async fn update(&self, id: &str, change: Change) -> Result<()> {
    self.store.update(id, change).await
  }

  async fn delete(&self, id: &str) -> Result<()> {
    self.store.delete(id).await
  }

  async fn list_by_profile(&self, profile_id: &str) -> Result<Vec<Account>> {
    self.store.list_by_profile(profile_id).await
  }
}

idmap_core::conformance_tests!(temp_store().await);

#[tokio::test]
async fn accounts_survive_reopen() {
  let dir = tempfile::tempdir().expect("create temp dir");
  let path = dir.path().join("idmap");

  let acct = conformance::account("paddy@example.com", "profile-1");
  {
    let store = LmdbStore::open(&path).await.expect("open store");
    store.create(acct.clone()).await.expect("create account");
    // The environment closes when the last handle drops.
  }

  let store = LmdbStore::open(&path).await.expect("reopen store");
  let got = store.get(&acct.id).await.expect("get persisted account");
  assert_eq!(got, acct);

  // The secondary index was persisted too.
  let listed = store.list_by_profile("profile-1").await.expect("list profile");
  assert_eq!(listed, vec![acct]);
}

#[tokio::test]
async fn profile_prefix_does_not_bleed() {
  // `p1` must not pick up `p10`'s accounts out of the secondary index.
  let wrapper = temp_store().await;

  let short = conformance::account("a@example.com", "p1");
  let long = conformance::account("b@example.com", "p10");
  wrapper.create(short.clone()).await.expect("create p1 account");
  wrapper.create(long.clone()).await.expect("create p10 account");

  assert_eq!(wrapper.list_by_profile("p1").await.expect("list p1"), vec![short]);
  assert_eq!(wrapper.list_by_profile("p10").await.expect("list p10"), vec![long]);
}
