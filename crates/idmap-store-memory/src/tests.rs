//! Tests for `MemoryStore`: the shared contract checks plus the
//! concurrency behavior only this backend can exercise cheaply.

use std::sync::Arc;

use idmap_core::{AccountStore, Error, conformance};

use crate::MemoryStore;

idmap_core::conformance_tests!(MemoryStore::new());

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_creates_admit_exactly_one() {
  let store = Arc::new(MemoryStore::new());

  let mut handles = Vec::new();
  for n in 0..16 {
    let store = Arc::clone(&store);
    handles.push(tokio::spawn(async move {
      let acct = conformance::account("race@example.com", &format!("profile-{n}"));
      store.create(acct).await
    }));
  }

  let mut created = 0;
  for handle in handles {
    match handle.await.expect("join create task") {
      Ok(()) => created += 1,
      Err(Error::AccountAlreadyExists) => {}
      Err(err) => panic!("unexpected error: {err:?}"),
    }
  }
  assert_eq!(created, 1);

  // The winner's account is intact and alone.
  store.get("race@example.com").await.expect("get raced account");
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_updates_serialize() {
  let store = Arc::new(MemoryStore::new());
  let acct = conformance::account("paddy@example.com", "profile-1");
  store.create(acct.clone()).await.expect("create account");

  let mut handles = Vec::new();
  for n in 0..16 {
    let store = Arc::clone(&store);
    handles.push(tokio::spawn(async move {
      let change = idmap_core::Change {
        last_used: Some(conformance::now() + chrono::TimeDelta::seconds(n)),
        last_seen: Some(conformance::now() + chrono::TimeDelta::seconds(n)),
      };
      store.update("paddy@example.com", change).await
    }));
  }
  for handle in handles {
    handle.await.expect("join update task").expect("update account");
  }

  // Every update applied both of its fields atomically, so whatever write
  // won, the immutable fields are untouched and the account is coherent.
  let got = store.get(&acct.id).await.expect("get account");
  assert_eq!(got.created, acct.created);
  assert_eq!(got.profile_id, acct.profile_id);
  assert!(got.last_used >= acct.last_used);
}
