//! Backend-independent contract checks.
//!
//! One body of checks, run by every backend crate's test module against its
//! own store, so all backends are held to the identical contract. Enabled
//! with the `conformance` feature and intended for test code only, so
//! assertions panic.
//!
//! Each check uses identifiers namespaced to itself and assumes a store
//! that does not already contain them; backend tests run each check against
//! a fresh store.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use uuid::Uuid;

use crate::{Account, AccountStore, Change, Error};

// ─── Fixtures ────────────────────────────────────────────────────────────────

/// `Utc::now()` truncated to microseconds — the finest timestamp precision
/// every backend round-trips losslessly.
pub fn now() -> DateTime<Utc> {
  Utc::now()
    .duration_trunc(TimeDelta::microseconds(1))
    .expect("truncate timestamp to microseconds")
}

/// A fresh opaque profile ID.
pub fn fresh_profile_id() -> String {
  Uuid::new_v4().to_string()
}

/// A fully populated, non-registration Account under `profile_id`.
pub fn account(id: &str, profile_id: &str) -> Account {
  let created = now();
  Account {
    id:              id.into(),
    profile_id:      profile_id.into(),
    created,
    last_used:       created,
    last_seen:       created,
    is_registration: false,
  }
}

// ─── Create / Get ────────────────────────────────────────────────────────────

pub async fn create_and_get(store: &impl AccountStore) {
  let acct = account("paddy@example.com", &fresh_profile_id());
  store.create(acct.clone()).await.expect("create account");

  let got = store.get(&acct.id).await.expect("get account");
  assert_eq!(got, acct);
}

pub async fn get_is_case_insensitive(store: &impl AccountStore) {
  let acct = account("Paddy@Example.com", &fresh_profile_id());
  store.create(acct.clone()).await.expect("create account");

  let got = store.get("paddy@example.com").await.expect("get folded id");
  // The stored identifier keeps its original case.
  assert_eq!(got, acct);

  let got = store.get("PADDY@EXAMPLE.COM").await.expect("get upper id");
  assert_eq!(got, acct);

  // Folding is full Unicode, not just ASCII A-Z.
  let acct = account("Ärger@example.com", &fresh_profile_id());
  store.create(acct.clone()).await.expect("create non-ascii account");
  let got = store.get("ärger@example.com").await.expect("get folded non-ascii id");
  assert_eq!(got, acct);
}

pub async fn get_missing_account(store: &impl AccountStore) {
  let err = store
    .get("nobody@example.com")
    .await
    .expect_err("get of a missing account must fail");
  assert!(matches!(err, Error::AccountNotFound), "got {err:?}");
}

pub async fn create_duplicate_id(store: &impl AccountStore) {
  let acct = account("paddy@example.com", &fresh_profile_id());
  store.create(acct.clone()).await.expect("create account");

  // Same identifier, different profile and timestamps.
  let mut dupe = account("paddy@example.com", &fresh_profile_id());
  dupe.created += TimeDelta::hours(1);
  dupe.last_used += TimeDelta::hours(1);
  dupe.last_seen += TimeDelta::hours(1);

  let err = store
    .create(dupe.clone())
    .await
    .expect_err("duplicate id must fail");
  assert!(matches!(err, Error::AccountAlreadyExists), "got {err:?}");

  // Differing only in case is still a duplicate.
  dupe.id = "Paddy@Example.COM".into();
  let err = store
    .create(dupe)
    .await
    .expect_err("case-variant duplicate id must fail");
  assert!(matches!(err, Error::AccountAlreadyExists), "got {err:?}");

  // The original must be left untouched.
  let got = store.get(&acct.id).await.expect("get original");
  assert_eq!(got, acct);

  // Non-ASCII case variants collide too.
  let umlaut = account("Ärger@example.com", &fresh_profile_id());
  store.create(umlaut.clone()).await.expect("create non-ascii account");
  let mut dupe = account("ÄRGER@example.com", &fresh_profile_id());
  dupe.created += TimeDelta::hours(1);
  let err = store
    .create(dupe)
    .await
    .expect_err("non-ascii case-variant duplicate id must fail");
  assert!(matches!(err, Error::AccountAlreadyExists), "got {err:?}");
}

pub async fn create_secondary_accounts(store: &impl AccountStore) {
  let profile = fresh_profile_id();

  let mut registration = account("paddy@example.com", &profile);
  registration.is_registration = true;
  store.create(registration.clone()).await.expect("create registration");

  // Secondary identifiers for the same profile are fine as long as they do
  // not claim to be the registration.
  let second = account("paddy@example.net", &profile);
  store.create(second.clone()).await.expect("create second account");
  let third = account("paddy@example.org", &profile);
  store.create(third.clone()).await.expect("create third account");

  for expected in [&registration, &second, &third] {
    let got = store.get(&expected.id).await.expect("get account");
    assert_eq!(&got, expected);
  }
}

pub async fn create_duplicate_registration(store: &impl AccountStore) {
  let profile = fresh_profile_id();

  let mut registration = account("paddy@example.com", &profile);
  registration.is_registration = true;
  store.create(registration.clone()).await.expect("create registration");

  let mut second = account("paddy@example.net", &profile);
  second.is_registration = true;
  let err = store
    .create(second)
    .await
    .expect_err("second registration for the profile must fail");
  assert!(matches!(err, Error::ProfileAlreadyRegistered), "got {err:?}");

  // The failed create must not have altered the first registration...
  let got = store.get(&registration.id).await.expect("get registration");
  assert_eq!(got, registration);

  // ...and a non-registration account is still accepted.
  let second = account("paddy@example.net", &profile);
  store.create(second).await.expect("create non-registration account");
}

pub async fn registrations_for_distinct_profiles(store: &impl AccountStore) {
  // Registration uniqueness is per profile, not global.
  let mut first = account("paddy@example.com", &fresh_profile_id());
  first.is_registration = true;
  store.create(first).await.expect("create first registration");

  let mut second = account("mara@example.com", &fresh_profile_id());
  second.is_registration = true;
  store.create(second).await.expect("create registration for other profile");
}

pub async fn reregister_after_delete(store: &impl AccountStore) {
  let profile = fresh_profile_id();

  let mut registration = account("paddy@example.com", &profile);
  registration.is_registration = true;
  store.create(registration.clone()).await.expect("create registration");
  store.delete(&registration.id).await.expect("delete registration");

  // Deleting the registration frees the slot for the profile.
  let mut replacement = account("mara@example.com", &profile);
  replacement.is_registration = true;
  store.create(replacement).await.expect("create replacement registration");
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// Create a handful of accounts, half sharing the target's profile, and
/// return them so callers can assert they were left alone.
async fn throwaways(store: &impl AccountStore, profile: &str, tag: &str) -> Vec<Account> {
  let mut accounts = Vec::new();
  for n in 0..5 {
    let profile_id = if n % 2 == 0 { profile.to_owned() } else { fresh_profile_id() };
    let mut acct = account(&format!("throwaway+{tag}+{n}@example.com"), &profile_id);
    acct.last_used += TimeDelta::hours(n);
    acct.last_seen += TimeDelta::seconds(n);
    store.create(acct.clone()).await.expect("create throwaway");
    accounts.push(acct);
  }
  accounts
}

pub async fn update_variations(store: &impl AccountStore) {
  let variations = [
    Change { last_used: Some(now() + TimeDelta::hours(1)), last_seen: None },
    Change { last_used: None, last_seen: Some(now() + TimeDelta::minutes(1)) },
    Change {
      last_used: Some(now() + TimeDelta::hours(2)),
      last_seen: Some(now() + TimeDelta::minutes(2)),
    },
  ];

  for (n, change) in variations.into_iter().enumerate() {
    let acct = account(&format!("paddy+{n}@example.com"), &fresh_profile_id());
    store.create(acct.clone()).await.expect("create account");
    let others = throwaways(store, &acct.profile_id, &format!("update{n}")).await;

    store.update(&acct.id, change).await.expect("update account");

    let got = store.get(&acct.id).await.expect("get updated account");
    assert_eq!(got, change.apply(acct));

    // No other account may be touched, shared profile or not.
    for other in others {
      let got = store.get(&other.id).await.expect("get throwaway");
      assert_eq!(got, other);
    }
  }
}

pub async fn update_missing_id_is_a_noop(store: &impl AccountStore) {
  let acct = account("paddy@example.com", &fresh_profile_id());
  store.create(acct.clone()).await.expect("create account");

  let change = Change { last_used: Some(now()), last_seen: None };
  store
    .update("nobody@example.com", change)
    .await
    .expect("updating a missing account must not error");

  let got = store.get(&acct.id).await.expect("get account");
  assert_eq!(got, acct);
}

pub async fn update_empty_change_is_a_noop(store: &impl AccountStore) {
  let acct = account("paddy@example.com", &fresh_profile_id());
  store.create(acct.clone()).await.expect("create account");

  store
    .update(&acct.id, Change::default())
    .await
    .expect("empty change must not error");
  let got = store.get(&acct.id).await.expect("get account");
  assert_eq!(got, acct);

  // Empty change against a missing id is equally a no-op.
  store
    .update("nobody@example.com", Change::default())
    .await
    .expect("empty change on a missing account must not error");
}

// ─── Delete ──────────────────────────────────────────────────────────────────

pub async fn delete_one_of_many(store: &impl AccountStore) {
  let acct = account("paddy@example.com", &fresh_profile_id());
  store.create(acct.clone()).await.expect("create account");
  let others = throwaways(store, &acct.profile_id, "delete").await;

  store.delete(&acct.id).await.expect("delete account");

  let err = store.get(&acct.id).await.expect_err("deleted account must be gone");
  assert!(matches!(err, Error::AccountNotFound), "got {err:?}");

  // Deleting never touches other accounts, shared profile included.
  for other in others {
    let got = store.get(&other.id).await.expect("get throwaway");
    assert_eq!(got, other);
  }
}

pub async fn delete_is_idempotent(store: &impl AccountStore) {
  let acct = account("paddy@example.com", &fresh_profile_id());
  store.create(acct.clone()).await.expect("create account");

  store.delete(&acct.id).await.expect("first delete");
  store.delete(&acct.id).await.expect("second delete must not error");
  store
    .delete("nobody@example.com")
    .await
    .expect("deleting a missing account must not error");
}

// ─── ListByProfile ───────────────────────────────────────────────────────────

pub async fn list_by_profile_orders_most_recent_first(store: &impl AccountStore) {
  let profile = fresh_profile_id();
  let base = now();

  // Created deliberately out of order.
  for (id, used) in [
    ("paddy+older@example.com", base - TimeDelta::minutes(1)),
    ("paddy+newest@example.com", base + TimeDelta::hours(1)),
    ("paddy+base@example.com", base),
  ] {
    let mut acct = account(id, &profile);
    acct.last_used = used;
    store.create(acct).await.expect("create account");
  }

  let listed = store.list_by_profile(&profile).await.expect("list accounts");
  let used: Vec<_> = listed.iter().map(|a| a.last_used).collect();
  assert_eq!(
    used,
    vec![base + TimeDelta::hours(1), base, base - TimeDelta::minutes(1)]
  );
}

pub async fn list_by_profile_unknown_profile_is_empty(store: &impl AccountStore) {
  let listed = store
    .list_by_profile(&fresh_profile_id())
    .await
    .expect("listing an unknown profile must not error");
  assert!(listed.is_empty());
}

pub async fn list_by_profile_is_case_sensitive(store: &impl AccountStore) {
  // Profile IDs are opaque tokens; only identifiers are case-folded.
  let acct = account("paddy@example.com", "Profile-AbC");
  store.create(acct.clone()).await.expect("create account");

  let listed = store.list_by_profile("Profile-AbC").await.expect("list exact");
  assert_eq!(listed, vec![acct]);

  let listed = store.list_by_profile("profile-abc").await.expect("list folded");
  assert!(listed.is_empty());
}

// ─── End-to-end scenario ─────────────────────────────────────────────────────

/// Registration, secondary identifier, rejected second registration, and a
/// profile listing — the whole lifecycle in one pass.
pub async fn registration_scenario(store: &impl AccountStore) {
  let mut a = account("a@x.com", "p1");
  a.is_registration = true;
  store.create(a.clone()).await.expect("create registration");

  let mut b = account("b@x.com", "p1");
  b.last_used = a.last_used + TimeDelta::minutes(5);
  store.create(b.clone()).await.expect("create secondary account");

  let mut c = account("c@x.com", "p1");
  c.is_registration = true;
  let err = store.create(c).await.expect_err("second registration must fail");
  assert!(matches!(err, Error::ProfileAlreadyRegistered), "got {err:?}");

  let listed = store.list_by_profile("p1").await.expect("list profile");
  assert_eq!(listed, vec![b, a]);
}

// ─── Test expansion ──────────────────────────────────────────────────────────

/// Expand one `#[tokio::test]` per contract check, each run against a fresh
/// store produced by the given expression.
///
/// ```ignore
/// idmap_core::conformance_tests!(SqliteStore::open_in_memory().await.expect("open store"));
/// ```
#[macro_export]
macro_rules! conformance_tests {
  ($new_store:expr) => {
    $crate::conformance_tests!(@expand $new_store;
      create_and_get,
      get_is_case_insensitive,
      get_missing_account,
      create_duplicate_id,
      create_secondary_accounts,
      create_duplicate_registration,
      registrations_for_distinct_profiles,
      reregister_after_delete,
      update_variations,
      update_missing_id_is_a_noop,
      update_empty_change_is_a_noop,
      delete_one_of_many,
      delete_is_idempotent,
      list_by_profile_orders_most_recent_first,
      list_by_profile_unknown_profile_is_empty,
      list_by_profile_is_case_sensitive,
      registration_scenario,
    );
  };
  (@expand $new_store:expr; $($check:ident),+ $(,)?) => {
    $(
      #[tokio::test]
      async fn $check() {
        let store = $new_store;
        $crate::conformance::$check(&store).await;
      }
    )+
  };
}
