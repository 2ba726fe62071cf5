//! Rights and licensing rules: enums, field validation, share-sum checks and
//! license lifecycle predicates.
//!
//! License predicates take `now` explicitly so callers (and tests) control
//! the clock.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Lower bound of an accepted share sum (percent).
pub const SHARE_SUM_MIN: f64 = 99.99;

/// Upper bound of an accepted share sum (percent).
pub const SHARE_SUM_MAX: f64 = 100.01;

/// Territory codes accepted on rights and licenses. `WW` means worldwide.
pub const VALID_TERRITORY_CODES: &[&str] = &[
    "US", "CA", "UK", "GB", "DE", "FR", "IT", "ES", "NL", "BE", "AT", "CH", "AU", "NZ", "JP",
    "KR", "CN", "HK", "SG", "TW", "TH", "MY", "ID", "PH", "IN", "BR", "MX", "AR", "CL", "CO",
    "PE", "ZA", "NG", "EG", "AE", "SA", "IL", "TR", "RU", "PL", "CZ", "HU", "RO", "GR", "PT",
    "SE", "NO", "DK", "FI", "IE", "WW",
];

/// ISO 4217 currency codes accepted for fees and payouts.
pub const VALID_CURRENCY_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "CAD", "AUD", "CHF", "CNY", "HKD", "NZD", "SEK", "KRW", "SGD",
    "NOK", "MXN", "INR", "BRL", "ZAR", "DKK", "PLN",
];

static IPI_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^\d{9,11}$").ok());
static ISNI_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d{15}[\dX]$").ok());

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Category of a right held over a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RightType {
    Mechanical,
    Performance,
    Sync,
    Master,
    Print,
    Neighboring,
}

impl RightType {
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "mechanical" => Ok(Self::Mechanical),
            "performance" => Ok(Self::Performance),
            "sync" => Ok(Self::Sync),
            "master" => Ok(Self::Master),
            "print" => Ok(Self::Print),
            "neighboring" => Ok(Self::Neighboring),
            other => Err(CoreError::Validation(format!(
                "Invalid right type '{other}'"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Mechanical => "mechanical",
            Self::Performance => "performance",
            Self::Sync => "sync",
            Self::Master => "master",
            Self::Print => "print",
            Self::Neighboring => "neighboring",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolderType {
    Label,
    Publisher,
    Pro,
    Distributor,
    Artist,
}

impl HolderType {
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "label" => Ok(Self::Label),
            "publisher" => Ok(Self::Publisher),
            "pro" => Ok(Self::Pro),
            "distributor" => Ok(Self::Distributor),
            "artist" => Ok(Self::Artist),
            other => Err(CoreError::Validation(format!(
                "Invalid holder type '{other}'"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Label => "label",
            Self::Publisher => "publisher",
            Self::Pro => "pro",
            Self::Distributor => "distributor",
            Self::Artist => "artist",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    Pending,
    Active,
    Expired,
    Terminated,
}

impl LicenseStatus {
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "terminated" => Ok(Self::Terminated),
            other => Err(CoreError::Validation(format!(
                "Invalid license status '{other}'"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Terminated => "terminated",
        }
    }
}

// ---------------------------------------------------------------------------
// Field validation
// ---------------------------------------------------------------------------

pub fn validate_share_percent(share: f64) -> Result<(), CoreError> {
    if share.is_finite() && (0.0..=100.0).contains(&share) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Share percent must be between 0 and 100, got {share}"
        )))
    }
}

pub fn is_valid_territory(code: &str) -> bool {
    VALID_TERRITORY_CODES.contains(&code)
}

/// Territories must be non-empty and every code known.
pub fn validate_territories(territories: &[String]) -> Result<(), CoreError> {
    if territories.is_empty() {
        return Err(CoreError::Validation("Territories are required".into()));
    }
    match territories.iter().find(|t| !is_valid_territory(t)) {
        Some(bad) => Err(CoreError::Validation(format!(
            "Invalid territory code '{bad}'"
        ))),
        None => Ok(()),
    }
}

/// End must not precede start when both are present.
pub fn validate_date_range(
    start: Option<&Timestamp>,
    end: Option<&Timestamp>,
) -> Result<(), CoreError> {
    match (start, end) {
        (Some(s), Some(e)) if e < s => Err(CoreError::Validation(
            "End date must not be before start date".into(),
        )),
        _ => Ok(()),
    }
}

pub fn is_valid_currency(code: &str) -> bool {
    VALID_CURRENCY_CODES.contains(&code)
}

pub fn validate_currency(code: &str) -> Result<(), CoreError> {
    if is_valid_currency(code) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid currency code '{code}'"
        )))
    }
}

/// IPI name numbers are 9 to 11 digits.
pub fn is_valid_ipi(value: &str) -> bool {
    IPI_PATTERN.as_ref().is_some_and(|re| re.is_match(value))
}

/// ISNI: 16 characters, digits with an optional trailing `X` check character.
pub fn is_valid_isni(value: &str) -> bool {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    ISNI_PATTERN.as_ref().is_some_and(|re| re.is_match(&compact))
}

// ---------------------------------------------------------------------------
// Share sums
// ---------------------------------------------------------------------------

/// Validate that the shares of one (track, right type) set sum to 100%.
pub fn validate_share_sum(right_type: RightType, shares: &[f64]) -> Result<(), CoreError> {
    if shares.is_empty() {
        return Err(CoreError::Validation(format!(
            "No holders provided for {} rights",
            right_type.name()
        )));
    }
    let sum: f64 = shares.iter().sum();
    if (SHARE_SUM_MIN..=SHARE_SUM_MAX).contains(&sum) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Share percentages for {} must sum to 100%, got {sum:.2}%",
            right_type.name()
        )))
    }
}

/// Validate every right-type group in a mixed list of `(type, share)` pairs.
pub fn validate_all_share_sums(entries: &[(RightType, f64)]) -> Result<(), CoreError> {
    let mut groups: Vec<(RightType, Vec<f64>)> = Vec::new();
    for (rt, share) in entries {
        match groups.iter_mut().find(|(g, _)| g == rt) {
            Some((_, shares)) => shares.push(*share),
            None => groups.push((*rt, vec![*share])),
        }
    }
    groups
        .iter()
        .try_for_each(|(rt, shares)| validate_share_sum(*rt, shares))
}

// ---------------------------------------------------------------------------
// License lifecycle
// ---------------------------------------------------------------------------

/// Fee must be non-negative; currency, when given, must be known.
pub fn validate_license_terms(fee: i64, currency: Option<&str>) -> Result<(), CoreError> {
    if fee < 0 {
        return Err(CoreError::Validation("Fee cannot be negative".into()));
    }
    match currency {
        Some(code) if !code.is_empty() => validate_currency(code),
        _ => Ok(()),
    }
}

/// Active: status is active and `now` lies within `[start, end]`.
pub fn license_is_active(
    status: LicenseStatus,
    start: &Timestamp,
    end: &Timestamp,
    now: &Timestamp,
) -> bool {
    status == LicenseStatus::Active && now >= start && now <= end
}

/// Expired: status says so, or `now` is past the end date.
pub fn license_is_expired(status: LicenseStatus, end: &Timestamp, now: &Timestamp) -> bool {
    status == LicenseStatus::Expired || now > end
}

pub fn license_can_auto_renew(
    auto_renew: bool,
    status: LicenseStatus,
    end: &Timestamp,
    now: &Timestamp,
) -> bool {
    auto_renew && status == LicenseStatus::Active && !license_is_expired(status, end, now)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
