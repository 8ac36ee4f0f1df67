use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, FixedOffset, Months, TimeDelta, Utc};
use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// IntervalUnit
// ---------------------------------------------------------------------------

/// Calendar unit of an [`IntervalStep`], spelled as a single-letter suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalUnit {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl IntervalUnit {
    fn from_suffix(c: char) -> Option<Self> {
        match c {
            'h' => Some(Self::Hour),
            'd' => Some(Self::Day),
            'w' => Some(Self::Week),
            'm' => Some(Self::Month),
            'y' => Some(Self::Year),
            _ => None,
        }
    }

    pub fn suffix(self) -> char {
        match self {
            Self::Hour => 'h',
            Self::Day => 'd',
            Self::Week => 'w',
            Self::Month => 'm',
            Self::Year => 'y',
        }
    }
}

// ---------------------------------------------------------------------------
// IntervalError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntervalError {
    #[error("invalid interval format {input:?} (expected <n>h, <n>d, <n>w, <n>m or <n>y)")]
    InvalidFormat { input: String },
    #[error("interval {step} does not advance {from}")]
    NonMonotonic {
        step: IntervalStep,
        from: DateTime<FixedOffset>,
    },
    #[error("advancing {from} by {step} leaves the supported date range")]
    OutOfRange {
        step: IntervalStep,
        from: DateTime<FixedOffset>,
    },
}

// ---------------------------------------------------------------------------
// IntervalStep
// ---------------------------------------------------------------------------

/// A cursor increment parsed from a human-readable string like `"48h"`,
/// `"2d"`, `"1w"`, `"1m"` or `"1y"`.
///
/// Hours are a fixed-length offset. Days and weeks are added to the calendar
/// date in the timestamp's own offset. Months and years clamp to the last day
/// of the target month when the source day does not exist there:
///
/// ```text
/// 2024-01-31 + 1m = 2024-02-29
/// 2024-02-29 + 1y = 2025-02-28
/// ```
///
/// The clamp is not undone on the following step, so a cursor that started on
/// the 31st keeps the shortened day (`01-31 → 02-29 → 03-29`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntervalStep {
    unit: IntervalUnit,
    magnitude: u32,
}

impl IntervalStep {
    /// Build a step and confirm it moves a reference timestamp forward.
    pub fn new(unit: IntervalUnit, magnitude: u32) -> Result<Self, IntervalError> {
        let step = Self { unit, magnitude };
        step.advance(reference_timestamp())?;
        Ok(step)
    }

    pub fn unit(&self) -> IntervalUnit {
        self.unit
    }

    pub fn magnitude(&self) -> u32 {
        self.magnitude
    }

    /// Advance `from` by one step.
    ///
    /// Fails with [`IntervalError::NonMonotonic`] unless the result is
    /// strictly after `from`.
    pub fn advance(
        &self,
        from: DateTime<FixedOffset>,
    ) -> Result<DateTime<FixedOffset>, IntervalError> {
        let n = self.magnitude;
        let next = match self.unit {
            IntervalUnit::Hour => {
                TimeDelta::try_hours(i64::from(n)).and_then(|d| from.checked_add_signed(d))
            }
            IntervalUnit::Day => from.checked_add_days(Days::new(u64::from(n))),
            IntervalUnit::Week => from.checked_add_days(Days::new(u64::from(n) * 7)),
            IntervalUnit::Month => from.checked_add_months(Months::new(n)),
            IntervalUnit::Year => n
                .checked_mul(12)
                .and_then(|months| from.checked_add_months(Months::new(months))),
        };
        let next = next.ok_or(IntervalError::OutOfRange { step: *self, from })?;
        if next <= from {
            return Err(IntervalError::NonMonotonic { step: *self, from });
        }
        Ok(next)
    }
}

impl Default for IntervalStep {
    /// Two days.
    fn default() -> Self {
        Self {
            unit: IntervalUnit::Day,
            magnitude: 2,
        }
    }
}

impl FromStr for IntervalStep {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, IntervalError> {
        let invalid = || IntervalError::InvalidFormat {
            input: s.to_string(),
        };
        let trimmed = s.trim();
        let suffix = trimmed.chars().next_back().ok_or_else(invalid)?;
        let unit = IntervalUnit::from_suffix(suffix).ok_or_else(invalid)?;

        let num_part = &trimmed[..trimmed.len() - suffix.len_utf8()];
        if num_part.is_empty() || !num_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let magnitude: u32 = num_part.parse().map_err(|_| invalid())?;

        Self::new(unit, magnitude)
    }
}

impl fmt::Display for IntervalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit.suffix())
    }
}

impl Serialize for IntervalStep {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for IntervalStep {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

/// Timestamp used to validate a freshly constructed step.
fn reference_timestamp() -> DateTime<FixedOffset> {
    DateTime::<Utc>::UNIX_EPOCH.fixed_offset()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
