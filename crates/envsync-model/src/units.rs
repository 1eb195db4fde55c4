//! Memory limit units
//!
//! Converts between byte counts and the suffixed limit strings used by
//! container resource sections (`512Mi`, `2Gi`, `1048576B`).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Memory limit used when neither configuration nor recipe carry one (2 GiB)
pub const DEFAULT_MEMORY_LIMIT_BYTES: u64 = 2_147_483_648;

/// `<digits><suffix>`, suffix of one to three letters
static LIMIT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+)([A-Za-z]{1,3})$").expect("limit pattern is valid"));

/// Binary memory unit
///
/// Ordered from finest to coarsest; the power is the exponent of 1024.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum MemoryUnit {
    /// Bytes
    B,
    /// Kibibytes
    Ki,
    /// Mebibytes
    #[default]
    Mi,
    /// Gibibytes
    Gi,
}

impl MemoryUnit {
    /// All units, finest first
    pub const ALL: [MemoryUnit; 4] = [Self::B, Self::Ki, Self::Mi, Self::Gi];

    /// Exponent of 1024
    #[inline]
    #[must_use]
    pub const fn power(self) -> u32 {
        match self {
            Self::B => 0,
            Self::Ki => 1,
            Self::Mi => 2,
            Self::Gi => 3,
        }
    }

    /// Number of bytes in one unit
    #[inline]
    #[must_use]
    pub const fn factor(self) -> u64 {
        1024u64.pow(self.power())
    }

    /// Suffix as written in limit strings
    #[inline]
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::B => "B",
            Self::Ki => "Ki",
            Self::Mi => "Mi",
            Self::Gi => "Gi",
        }
    }

    /// Look up a unit by its exact suffix
    #[must_use]
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|unit| unit.suffix() == suffix)
    }
}

impl Display for MemoryUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for MemoryUnit {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_suffix(s).ok_or_else(|| UnknownUnit(s.to_string()))
    }
}

/// Unit suffix outside the `B`/`Ki`/`Mi`/`Gi` table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown memory unit: '{0}' (expected one of B, Ki, Mi, Gi)")]
pub struct UnknownUnit(pub String);

/// Format a byte count as a limit string in `unit`
///
/// When `bytes` is not a whole multiple of `unit`, the next finer unit that
/// divides it exactly is used instead, so the string always parses back to
/// the same byte count.
#[must_use]
pub fn bytes_to_limit_string(bytes: u64, unit: MemoryUnit) -> String {
    let unit = MemoryUnit::ALL
        .into_iter()
        .rev()
        .filter(|candidate| *candidate <= unit)
        .find(|candidate| bytes % candidate.factor() == 0)
        .unwrap_or(MemoryUnit::B);
    format!("{}{}", bytes / unit.factor(), unit.suffix())
}

/// Parse a limit string into bytes
///
/// Returns `None` when the string does not match `<digits><suffix>`, the
/// suffix is unknown, or the result overflows. `None` means "unparseable" and
/// is distinct from a zero limit.
#[must_use]
pub fn limit_string_to_bytes(limit: &str) -> Option<u64> {
    let captures = LIMIT_PATTERN.captures(limit)?;
    let unit = MemoryUnit::from_suffix(&captures[2])?;
    let amount: u64 = captures[1].parse().ok()?;
    amount.checked_mul(unit.factor())
}
