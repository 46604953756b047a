//! Tests for `SqliteStore`: the shared contract checks against an
//! in-memory database, plus file-backed behavior.

use idmap_core::{AccountStore, conformance};

use crate::SqliteStore;

idmap_core::conformance_tests!(
  SqliteStore::open_in_memory().await.expect("open in-memory store")
);

#[tokio::test]
async fn accounts_survive_reopen() {
  let dir = tempfile::tempdir().expect("create temp dir");
  let path = dir.path().join("accounts.db");

  let acct = conformance::account("paddy@example.com", "profile-1");
  {
    let store = SqliteStore::open(&path).await.expect("open store");
    store.create(acct.clone()).await.expect("create account");
  }

  // Reopen runs the (idempotent) schema DDL against existing data.
  let store = SqliteStore::open(&path).await.expect("reopen store");
  let got = store.get(&acct.id).await.expect("get persisted account");
  assert_eq!(got, acct);
}

#[tokio::test]
async fn registration_constraint_survives_reopen() {
  let dir = tempfile::tempdir().expect("create temp dir");
  let path = dir.path().join("accounts.db");

  {
    let store = SqliteStore::open(&path).await.expect("open store");
    let mut registration = conformance::account("paddy@example.com", "profile-1");
    registration.is_registration = true;
    store.create(registration).await.expect("create registration");
  }

  let store = SqliteStore::open(&path).await.expect("reopen store");
  let mut second = conformance::account("mara@example.com", "profile-1");
  second.is_registration = true;
  let err = store
    .create(second)
    .await
    .expect_err("second registration must fail after reopen");
  assert!(matches!(err, idmap_core::Error::ProfileAlreadyRegistered), "got {err:?}");
}
