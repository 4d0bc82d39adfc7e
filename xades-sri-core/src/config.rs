//! Signer configuration.
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;

/// Error returned when building a [`SignerConfig`] from invalid parts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid Id suffix range: min {min} is greater than max {max}")]
    InvalidIdRange { min: u32, max: u32 },
}

/// Inclusive range the numeric `Id` suffixes of a signature are drawn from.
///
/// Always non-empty; [`IdRange::new`] and deserialization both reject `min > max`.
///
/// # Examples
/// ```rust
/// use xades_sri_core::config::IdRange;
///
/// let range = IdRange::new(1000, 1999)?;
/// assert_eq!(range.min(), 1000);
/// assert!(IdRange::new(5, 1).is_err());
/// # Ok::<(), xades_sri_core::config::ConfigError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawIdRange", into = "RawIdRange")]
pub struct IdRange {
    min: u32,
    max: u32,
}

#[derive(Serialize, Deserialize)]
struct RawIdRange {
    min: u32,
    max: u32,
}

impl IdRange {
    pub const DEFAULT_MIN: u32 = 990;
    pub const DEFAULT_MAX: u32 = 9999;

    pub fn new(min: u32, max: u32) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::InvalidIdRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn as_range(&self) -> RangeInclusive<u32> {
        self.min..=self.max
    }
}

impl Default for IdRange {
    fn default() -> Self {
        Self {
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}

impl TryFrom<RawIdRange> for IdRange {
    type Error = ConfigError;

    fn try_from(raw: RawIdRange) -> Result<Self, Self::Error> {
        IdRange::new(raw.min, raw.max)
    }
}

impl From<IdRange> for RawIdRange {
    fn from(range: IdRange) -> Self {
        RawIdRange {
            min: range.min,
            max: range.max,
        }
    }
}

/// Options for [`DocumentSigner`](crate::sign::DocumentSigner).
///
/// # Examples
/// ```rust
/// use xades_sri_core::config::SignerConfig;
///
/// let config = SignerConfig::default().with_declaration_line_break(false);
/// assert!(!config.declaration_line_break());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    declaration_line_break: bool,
    id_range: IdRange,
}

impl SignerConfig {
    pub fn new(declaration_line_break: bool, id_range: IdRange) -> Self {
        Self {
            declaration_line_break,
            id_range,
        }
    }

    /// Whether a line break is re-inserted after the XML declaration of the signed output.
    pub fn declaration_line_break(&self) -> bool {
        self.declaration_line_break
    }

    pub fn id_range(&self) -> IdRange {
        self.id_range
    }

    pub fn with_declaration_line_break(mut self, enabled: bool) -> Self {
        self.declaration_line_break = enabled;
        self
    }

    pub fn with_id_range(mut self, id_range: IdRange) -> Self {
        self.id_range = id_range;
        self
    }
}

impl Default for SignerConfig {
    fn default() -> Self {
        SignerConfig {
            declaration_line_break: true,
            id_range: IdRange::default(),
        }
    }
}
