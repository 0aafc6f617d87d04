//! Migration version numbers.
//!
//! Versions are positive integers assigned to script pairs; `Version::ZERO`
//! stands for "nothing applied". The ledger stores them as `BIGINT`, so every
//! version must also fit in an `i64`.

use thiserror::Error;

/// A migration version. Zero means no migration has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version(u64);

/// Error returned when a string or ledger value is not a valid version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseVersionError {
    /// Not a decimal integer.
    #[error("'{0}' is not a valid version number")]
    NotANumber(String),

    /// Larger than the ledger column can hold.
    #[error("version {0} exceeds the maximum storable version")]
    TooLarge(u64),

    /// Negative value read back from the ledger.
    #[error("negative version {0} is not allowed")]
    Negative(i64),
}

impl Version {
    /// The empty ledger.
    pub const ZERO: Self = Self(0);

    /// Largest version the ledger column can hold.
    pub const MAX: Self = Self(i64::MAX as u64);

    /// Creates a version, rejecting values that do not fit the ledger column.
    pub fn new(value: u64) -> Result<Self, ParseVersionError> {
        if value > Self::MAX.0 {
            return Err(ParseVersionError::TooLarge(value));
        }
        Ok(Self(value))
    }

    /// Returns the raw version number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns true for the empty ledger.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// The version one step ahead, or `None` at `Version::MAX`.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        if self.0 >= Self::MAX.0 {
            None
        } else {
            Some(Self(self.0 + 1))
        }
    }

    /// The version one step back, or `None` at zero.
    #[must_use]
    pub const fn prev(self) -> Option<Self> {
        match self.0 {
            0 => None,
            n => Some(Self(n - 1)),
        }
    }

    /// Converts to the ledger's `BIGINT` representation.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn to_i64(self) -> i64 {
        // `new` guarantees the value fits.
        self.0 as i64
    }
}

impl TryFrom<i64> for Version {
    type Error = ParseVersionError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| ParseVersionError::Negative(value))
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseVersionError::NotANumber(s.to_string()));
        }
        let value: u64 = s
            .parse()
            .map_err(|_| ParseVersionError::NotANumber(s.to_string()))?;
        Self::new(value)
    }
}
