//! Module versions and version ranges.
//!
//! Versions follow the `major[.minor[.micro[.qualifier]]]` form used in
//! module manifests. Missing numeric parts default to zero, and the
//! qualifier is compared as a plain string after the numeric parts.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::filter::Filter;
use crate::error::{ModGraphError, Result};

/// A module version.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub micro: u64,
    pub qualifier: String,
}

impl Version {
    /// The empty version, `0.0.0`.
    pub const fn empty() -> Self {
        Self {
            major: 0,
            minor: 0,
            micro: 0,
            qualifier: String::new(),
        }
    }

    /// Create a version without a qualifier.
    pub fn new(major: u64, minor: u64, micro: u64) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    /// Parse a version string. An empty or blank string yields `0.0.0`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::empty());
        }

        let invalid = |message: &str| ModGraphError::InvalidVersion {
            input: input.to_string(),
            message: message.to_string(),
        };

        let mut parts = trimmed.splitn(4, '.');
        let mut numbers = [0u64; 3];
        for (i, slot) in numbers.iter_mut().enumerate() {
            match parts.next() {
                Some(part) => {
                    *slot = part.parse().map_err(|_| {
                        invalid(["invalid major", "invalid minor", "invalid micro"][i])
                    })?;
                }
                None => break,
            }
        }

        let qualifier = parts.next().unwrap_or_default();
        if !qualifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(invalid("invalid qualifier"));
        }
        if trimmed.matches('.').count() == 3 && qualifier.is_empty() {
            return Err(invalid("empty qualifier"));
        }

        Ok(Self {
            major: numbers[0],
            minor: numbers[1],
            micro: numbers[2],
            qualifier: qualifier.to_string(),
        })
    }

    /// Same major, minor and micro, ignoring the qualifier.
    pub fn same_release(&self, other: &Version) -> bool {
        self.major == other.major && self.minor == other.minor && self.micro == other.micro
    }
}

impl FromStr for Version {
    type Err = ModGraphError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A version interval such as `[1.0,2.0)`, or a bare floor such as `1.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    pub floor: Version,
    pub floor_inclusive: bool,
    pub ceiling: Option<Version>,
    pub ceiling_inclusive: bool,
}

impl VersionRange {
    /// A range matching every version at or above `floor`.
    pub fn at_least(floor: Version) -> Self {
        Self {
            floor,
            floor_inclusive: true,
            ceiling: None,
            ceiling_inclusive: false,
        }
    }

    /// Parse an interval or a bare version.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let invalid = |message: &str| ModGraphError::InvalidVersion {
            input: input.to_string(),
            message: message.to_string(),
        };

        let floor_inclusive = match trimmed.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Ok(Self::at_least(Version::parse(trimmed)?)),
        };
        let ceiling_inclusive = match trimmed.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(invalid("unterminated range")),
        };

        let body = &trimmed[1..trimmed.len() - 1];
        let (low, high) = body
            .split_once(',')
            .ok_or_else(|| invalid("range requires two versions"))?;
        let floor = Version::parse(low)?;
        let ceiling = Version::parse(high)?;
        if ceiling < floor {
            return Err(invalid("ceiling below floor"));
        }

        Ok(Self {
            floor,
            floor_inclusive,
            ceiling: Some(ceiling),
            ceiling_inclusive,
        })
    }

    /// Whether `version` lies within the range.
    pub fn includes(&self, version: &Version) -> bool {
        let above_floor = if self.floor_inclusive {
            version >= &self.floor
        } else {
            version > &self.floor
        };
        let below_ceiling = match &self.ceiling {
            None => true,
            Some(c) if self.ceiling_inclusive => version <= c,
            Some(c) => version < c,
        };
        above_floor && below_ceiling
    }

    /// Express the range as a filter over `attribute`.
    pub fn to_filter(&self, attribute: &str) -> Filter {
        let floor = Filter::greater_eq(attribute, &self.floor.to_string());
        let floor = if self.floor_inclusive {
            floor
        } else {
            Filter::Not(Box::new(Filter::less_eq(
                attribute,
                &self.floor.to_string(),
            )))
        };

        match &self.ceiling {
            None => floor,
            Some(ceiling) => {
                let ceiling = if self.ceiling_inclusive {
                    Filter::less_eq(attribute, &ceiling.to_string())
                } else {
                    Filter::Not(Box::new(Filter::greater_eq(
                        attribute,
                        &ceiling.to_string(),
                    )))
                };
                Filter::And(vec![floor, ceiling])
            }
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ceiling {
            None => write!(f, "{}", self.floor),
            Some(ceiling) => write!(
                f,
                "{}{},{}{}",
                if self.floor_inclusive { '[' } else { '(' },
                self.floor,
                ceiling,
                if self.ceiling_inclusive { ']' } else { ')' }
            ),
        }
    }
}
