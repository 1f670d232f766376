//! # Identity Newtypes
//!
//! Identifier newtypes used throughout the engine. Each identifier is a
//! distinct type, so a [`PortfolioId`] cannot be passed where a
//! [`PatentId`] is expected.
//!
//! ## Validation
//!
//! String-based identifiers ([`PatentId`], [`PortfolioId`],
//! [`JurisdictionCode`]) are trimmed and must be non-empty. Jurisdiction
//! codes are additionally upper-cased so `"cn"` and `"CN"` address the same
//! vocabulary table. UUID-based identifiers ([`SubscriptionId`],
//! [`EventId`]) are always valid by construction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Implements `Deserialize` for string newtypes by routing the raw string
/// through the type's validating `new()` constructor.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// String-based identifiers (validated at construction)
// ---------------------------------------------------------------------------

/// Identifier of a tracked patent or application, as issued by its office
/// (e.g. `"CN202310001234.5"`, `"US11234567B2"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PatentId(String);

impl_validating_deserialize!(PatentId);

impl PatentId {
    /// Create a patent identifier, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyPatentId`] for empty or
    /// whitespace-only input.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let trimmed = value.into().trim().to_string();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyPatentId);
        }
        Ok(Self(trimmed))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PatentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a portfolio grouping many patents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PortfolioId(String);

impl_validating_deserialize!(PortfolioId);

impl PortfolioId {
    /// Create a portfolio identifier, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyPortfolioId`] for empty or
    /// whitespace-only input.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let trimmed = value.into().trim().to_string();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyPortfolioId);
        }
        Ok(Self(trimmed))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PortfolioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Patent-office jurisdiction code (`"CN"`, `"US"`, `"EP"`, `"JP"`, `"KR"`).
///
/// Not an enum: supported jurisdictions are whatever the status vocabulary
/// tables define, so adding one is a configuration change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct JurisdictionCode(String);

impl_validating_deserialize!(JurisdictionCode);

impl JurisdictionCode {
    /// Create a jurisdiction code, trimming and upper-casing the input.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyJurisdiction`] for empty or
    /// whitespace-only input.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let normalized = value.into().trim().to_uppercase();
        if normalized.is_empty() {
            return Err(ValidationError::EmptyJurisdiction);
        }
        Ok(Self(normalized))
    }

    /// Access the normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JurisdictionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// UUID-based identifiers (always valid by construction)
// ---------------------------------------------------------------------------

/// Identifier of a status-change notification subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new random subscription identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a subscription identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SubscriptionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

/// Identifier of an append-only status history event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Create a new random event identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
