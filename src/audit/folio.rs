//! Folio: the human-readable identifier stamped on an audit when it starts.
//!
//! Shape is `AB-YYYYMMDD-NNNN`. The suffix is random in `[1000, 9999]`; uniqueness
//! beyond that is left to the storage uniqueness constraint on `folio`.

use chrono::NaiveDate;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::core::error::AuditError;

pub const FOLIO_PREFIX: &str = "AB";
pub const SUFFIX_MIN: u32 = 1000;
pub const SUFFIX_MAX: u32 = 9999;

fn folio_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^AB-(\d{8})-(\d{4})$").expect("folio pattern is a valid regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Folio(String);

impl Folio {
    pub fn generate<R: Rng>(date: NaiveDate, rng: &mut R) -> Self {
        let suffix = rng.gen_range(SUFFIX_MIN..=SUFFIX_MAX);
        Folio(format!("{}-{}-{}", FOLIO_PREFIX, date.format("%Y%m%d"), suffix))
    }

    pub fn parse(raw: &str) -> Result<Self, AuditError> {
        let caps = folio_pattern().captures(raw.trim()).ok_or_else(|| {
            AuditError::Validation(format!(
                "invalid folio '{}' (expected {}-YYYYMMDD-NNNN)",
                raw, FOLIO_PREFIX
            ))
        })?;
        NaiveDate::parse_from_str(&caps[1], "%Y%m%d").map_err(|_| {
            AuditError::Validation(format!("folio '{}' carries an impossible date", raw))
        })?;
        let suffix: u32 = caps[2].parse().unwrap_or_default();
        if suffix < SUFFIX_MIN {
            return Err(AuditError::Validation(format!(
                "folio '{}' suffix below {}",
                raw, SUFFIX_MIN
            )));
        }
        Ok(Folio(raw.trim().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Folio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Folio {
    type Error = AuditError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Folio::parse(&value)
    }
}

impl From<Folio> for String {
    fn from(value: Folio) -> Self {
        value.0
    }
}
