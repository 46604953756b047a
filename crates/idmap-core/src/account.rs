//! The `Account` record and its pure helpers.
//!
//! An Account binds one user-facing identifier to a profile ID. A profile
//! may own any number of Accounts; they are interchangeable ways to refer
//! to the same logical user. All functions here produce new values rather
//! than mutating their input, so callers never need to defensively clone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Account ─────────────────────────────────────────────────────────────────

/// One identifier→profile binding.
///
/// The serde field names match the external JSON representation
/// (`profileID`, `createdAt`, ...); the store itself never speaks JSON
/// except where a backend encodes documents with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
  /// The user-facing identifier. Globally unique, compared
  /// case-insensitively, immutable once created.
  pub id: String,

  /// The opaque profile this identifier resolves to. Shared by every
  /// Account of the same logical user. Generated by the caller, never by
  /// the store, and matched exactly (case-sensitively).
  #[serde(rename = "profileID")]
  pub profile_id: String,

  /// When the Account was created. Immutable.
  #[serde(rename = "createdAt", default)]
  pub created: DateTime<Utc>,

  /// Last full authentication (e.g. a password check).
  #[serde(rename = "lastUsedAt", default)]
  pub last_used: DateTime<Utc>,

  /// Last observed activity (e.g. a token use). May move forward more
  /// often than `last_used`.
  #[serde(rename = "lastSeenAt", default)]
  pub last_seen: DateTime<Utc>,

  /// True only for the Account that established the profile. At most one
  /// Account per profile carries this flag.
  #[serde(rename = "isRegistration", default)]
  pub is_registration: bool,
}

impl Account {
  /// Fill every unset timestamp with a reasonable default: a zero
  /// `created` becomes now, a zero `last_used` becomes `created`, a zero
  /// `last_seen` becomes `last_used`.
  ///
  /// Callers apply this before [`create`](crate::store::AccountStore::create);
  /// the store never fills defaults itself. Idempotent.
  #[must_use]
  pub fn fill_defaults(mut self) -> Self {
    let zero = DateTime::<Utc>::default();
    if self.created == zero {
      self.created = Utc::now();
    }
    if self.last_used == zero {
      self.last_used = self.created;
    }
    if self.last_seen == zero {
      self.last_seen = self.last_used;
    }
    self
  }
}

// ─── Change ──────────────────────────────────────────────────────────────────

/// A sparse update to an Account's mutable timestamps.
///
/// Unset fields are left untouched when the Change is applied. `id`,
/// `profile_id`, `created`, and `is_registration` cannot be changed at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
  #[serde(rename = "lastUsedAt", default, skip_serializing_if = "Option::is_none")]
  pub last_used: Option<DateTime<Utc>>,

  #[serde(rename = "lastSeenAt", default, skip_serializing_if = "Option::is_none")]
  pub last_seen: Option<DateTime<Utc>>,
}

impl Change {
  /// True if applying the Change would alter no Account.
  pub fn is_empty(&self) -> bool {
    self.last_used.is_none() && self.last_seen.is_none()
  }

  /// Return a copy of `account` with the set fields overwritten.
  #[must_use]
  pub fn apply(&self, account: Account) -> Account {
    let mut res = account;
    if let Some(used) = self.last_used {
      res.last_used = used;
    }
    if let Some(seen) = self.last_seen {
      res.last_seen = seen;
    }
    res
  }
}

// ─── Shared helpers ──────────────────────────────────────────────────────────

/// Case-fold an identifier for uniqueness comparison and index keys.
/// Identifiers differing only in case refer to the same Account.
pub fn fold_id(id: &str) -> String {
  id.to_lowercase()
}

/// Sort Accounts most-recently-used first.
///
/// The sort is stable: ties keep the caller's order, so a backend that
/// feeds this from an ordered index scan gets deterministic results.
pub fn by_last_used_desc(accounts: &mut [Account]) {
  accounts.sort_by(|a, b| b.last_used.cmp(&a.last_used));
}

#[cfg(test)]
mod tests {
  use chrono::TimeDelta;

  use super::*;

  fn account() -> Account {
    Account {
      id:              "paddy@example.com".into(),
      profile_id:      "profile-1".into(),
      created:         Utc::now(),
      last_used:       Utc::now(),
      last_seen:       Utc::now(),
      is_registration: false,
    }
  }

  #[test]
  fn fill_defaults_cascades() {
    let zeroed = Account {
      created:   DateTime::default(),
      last_used: DateTime::default(),
      last_seen: DateTime::default(),
      ..account()
    };
    let filled = zeroed.fill_defaults();
    assert_ne!(filled.created, DateTime::<Utc>::default());
    assert_eq!(filled.last_used, filled.created);
    assert_eq!(filled.last_seen, filled.last_used);
  }

  #[test]
  fn fill_defaults_is_idempotent() {
    let filled = account().fill_defaults();
    assert_eq!(filled.clone().fill_defaults(), filled);
  }

  #[test]
  fn fill_defaults_keeps_set_values() {
    let acct = account();
    let filled = acct.clone().fill_defaults();
    assert_eq!(filled, acct);
  }

  #[test]
  fn empty_change_applies_nothing() {
    let acct = account();
    let change = Change::default();
    assert!(change.is_empty());
    assert_eq!(change.apply(acct.clone()), acct);
  }

  #[test]
  fn change_overwrites_only_set_fields() {
    let acct = account();
    let used = Utc::now() + TimeDelta::hours(1);
    let change = Change { last_used: Some(used), last_seen: None };
    assert!(!change.is_empty());

    let updated = change.apply(acct.clone());
    assert_eq!(updated.last_used, used);
    assert_eq!(updated.last_seen, acct.last_seen);
    assert_eq!(updated.created, acct.created);
    assert_eq!(updated.id, acct.id);
  }

  #[test]
  fn sort_is_most_recent_first() {
    let base = Utc::now();
    let mut accounts: Vec<Account> = [
      base - TimeDelta::minutes(1),
      base + TimeDelta::hours(1),
      base,
    ]
    .into_iter()
    .enumerate()
    .map(|(i, used)| Account {
      id: format!("paddy+{i}@example.com"),
      last_used: used,
      ..account()
    })
    .collect();

    by_last_used_desc(&mut accounts);
    let used: Vec<_> = accounts.iter().map(|a| a.last_used).collect();
    assert_eq!(used, vec![base + TimeDelta::hours(1), base, base - TimeDelta::minutes(1)]);
  }

  #[test]
  fn json_uses_external_field_names() {
    let acct = account();
    let json = serde_json::to_value(&acct).expect("serialize account");
    for field in ["id", "profileID", "createdAt", "lastUsedAt", "lastSeenAt", "isRegistration"] {
      assert!(json.get(field).is_some(), "missing field {field}");
    }
  }
}
