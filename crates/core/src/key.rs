//! Resource key derivation for diary documents.
//!
//! Every stored document lives under a per-user prefix, and the key for a
//! logical resource is a pure function of (user prefix, logical
//! identifier). The remote store and the local caches both address
//! documents by these keys, so the derivation must stay stable.

use chrono::{Datelike, NaiveDate};

use crate::Error;

/// Derives resource keys under a per-user prefix.
#[derive(Debug, Clone)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    /// Create a key space for the given user prefix.
    ///
    /// An empty prefix is allowed (single-user deployments).
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        while prefix.ends_with('/') {
            prefix.pop();
        }
        Self { prefix }
    }

    /// Key for the diary entry on a given date:
    /// `<prefix>/entries/YYYY/MM/DD.json`.
    pub fn entry(&self, date: NaiveDate) -> String {
        format!(
            "{}/entries/{:04}/{:02}/{:02}.json",
            self.prefix,
            date.year(),
            date.month(),
            date.day()
        )
    }

    /// Key for the per-user settings document: `<prefix>/settings.json`.
    pub fn settings(&self) -> String {
        format!("{}/settings.json", self.prefix)
    }

    /// Key for a weekly summary document: `<prefix>/weekly/YYYY-WW.json`.
    pub fn weekly(&self, year: i32, iso_week: u32) -> String {
        format!("{}/weekly/{:04}-{:02}.json", self.prefix, year, iso_week)
    }

    /// Key for an external connector's status document:
    /// `<prefix>/connectors/<provider>.json`.
    pub fn connector(&self, provider: &str) -> String {
        format!("{}/connectors/{}.json", self.prefix, provider)
    }

    /// Prefix under which all entry keys live, for cache scans.
    pub fn entry_prefix(&self) -> String {
        format!("{}/entries/", self.prefix)
    }
}

/// Parse an entry key back into its date.
///
/// Accepts any key ending in `entries/YYYY/MM/DD.json`.
///
/// # Errors
///
/// Returns `Error::InvalidKey` if the key does not match the entry layout
/// or encodes an impossible date.
pub fn entry_date(key: &str) -> Result<NaiveDate, Error> {
    let invalid = || Error::InvalidKey(key.to_string());

    let rest = key.rsplit_once("entries/").map(|(_, r)| r).ok_or_else(invalid)?;
    let rest = rest.strip_suffix(".json").ok_or_else(invalid)?;

    let mut parts = rest.split('/');
    let (y, m, d) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(y), Some(m), Some(d), None) => (y, m, d),
        _ => return Err(invalid()),
    };

    let year: i32 = y.parse().map_err(|_| invalid())?;
    let month: u32 = m.parse().map_err(|_| invalid())?;
    let day: u32 = d.parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}
