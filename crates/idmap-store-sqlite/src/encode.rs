//! Encoding between domain types and the plain-text SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings at microsecond
//! precision, so lexicographic ordering in SQL equals chronological
//! ordering and `ORDER BY last_used_at DESC` can be pushed down safely.

use chrono::{DateTime, SecondsFormat, Utc};
use idmap_core::{Account, Error, Result};

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|err| Error::backend(format!("invalid stored timestamp {s:?}: {err}")))
}

/// One row of the `accounts` table, still in column form.
pub struct RawAccount {
  pub id:              String,
  pub profile_id:      String,
  pub created_at:      String,
  pub last_used_at:    String,
  pub last_seen_at:    String,
  pub is_registration: bool,
}

impl RawAccount {
  /// Read a row selected with [`COLUMNS`](crate::store::COLUMNS).
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      profile_id:      row.get(1)?,
      created_at:      row.get(2)?,
      last_used_at:    row.get(3)?,
      last_seen_at:    row.get(4)?,
      is_registration: row.get(5)?,
    })
  }

  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      id:              self.id,
      profile_id:      self.profile_id,
      created:         decode_dt(&self.created_at)?,
      last_used:       decode_dt(&self.last_used_at)?,
      last_seen:       decode_dt(&self.last_seen_at)?,
      is_registration: self.is_registration,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeDelta;

  use super::*;

  #[test]
  fn timestamps_round_trip() {
    // encode_dt normalises to the Z suffix regardless of the parsed offset.
    let dt = decode_dt("2024-06-01T12:30:45.123456+00:00").expect("decode");
    assert_eq!(encode_dt(dt), "2024-06-01T12:30:45.123456Z");
    assert_eq!(decode_dt(&encode_dt(dt)).expect("decode encoded"), dt);
  }

  #[test]
  fn encoded_order_is_chronological() {
    // Fixed-width encoding is what lets the ORDER BY push-down work.
    let base = decode_dt("2024-06-01T12:30:45.000000+00:00").expect("decode");
    let mut times = vec![
      base + TimeDelta::microseconds(1),
      base - TimeDelta::minutes(1),
      base + TimeDelta::hours(1),
      base,
    ];
    let mut encoded: Vec<String> = times.iter().copied().map(encode_dt).collect();
    times.sort();
    encoded.sort();
    assert_eq!(encoded, times.into_iter().map(encode_dt).collect::<Vec<_>>());
  }

  #[test]
  fn garbage_timestamp_is_a_backend_error() {
    assert!(decode_dt("not-a-time").is_err());
  }
}
