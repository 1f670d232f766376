//! # Unified Status Code: Single Source of Truth
//!
//! Every patent office publishes legal status in its own vocabulary. The
//! engine normalizes all of them onto the twelve [`UnifiedStatusCode`]
//! variants defined here. Adding a variant forces every consumer to handle
//! it at compile time.
//!
//! ## Invariant
//!
//! Every code is exactly one of terminal or active:
//! `is_terminal(c) != is_active(c)` for all `c`. The mapper's fallback
//! (`Filed`) and the anomaly detector's lapse rule both rely on it.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;

/// Jurisdiction-independent legal state of a patent.
///
/// | Code | Terminal | Meaning |
/// |------|----------|---------|
/// | Filed | no | Application received |
/// | Published | no | Application laid open |
/// | UnderExamination | no | Substantive examination running |
/// | Granted | no | Rights in force |
/// | Lapsed | yes | Rights lost, usually for unpaid annuities |
/// | Withdrawn | yes | Withdrawn or deemed withdrawn |
/// | Rejected | yes | Finally refused |
/// | Expired | yes | Statutory term ended |
/// | Revoked | yes | Invalidated or revoked |
/// | UnderAppeal | no | Appeal, opposition or reexamination pending |
/// | Transferred | no | Ownership change recorded |
/// | LicenseRecorded | no | License registered against the right |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnifiedStatusCode {
    /// Application received by the office.
    Filed,
    /// Application published.
    Published,
    /// Substantive examination in progress.
    UnderExamination,
    /// Patent granted and in force.
    Granted,
    /// Rights lapsed (typically annuity non-payment).
    Lapsed,
    /// Application withdrawn or deemed withdrawn.
    Withdrawn,
    /// Application finally rejected.
    Rejected,
    /// Statutory term expired.
    Expired,
    /// Patent revoked or declared invalid.
    Revoked,
    /// Appeal, opposition or reexamination pending.
    UnderAppeal,
    /// Assignment or transfer of ownership recorded.
    Transferred,
    /// License recorded against the patent.
    LicenseRecorded,
}

/// Total number of unified status codes.
pub const UNIFIED_STATUS_CODE_COUNT: usize = 12;

impl UnifiedStatusCode {
    /// Returns all twelve codes in canonical order.
    pub fn all() -> &'static [UnifiedStatusCode] {
        &[
            Self::Filed,
            Self::Published,
            Self::UnderExamination,
            Self::Granted,
            Self::Lapsed,
            Self::Withdrawn,
            Self::Rejected,
            Self::Expired,
            Self::Revoked,
            Self::UnderAppeal,
            Self::Transferred,
            Self::LicenseRecorded,
        ]
    }

    /// Returns the wire identifier, matching the serde format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filed => "FILED",
            Self::Published => "PUBLISHED",
            Self::UnderExamination => "UNDER_EXAMINATION",
            Self::Granted => "GRANTED",
            Self::Lapsed => "LAPSED",
            Self::Withdrawn => "WITHDRAWN",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
            Self::Revoked => "REVOKED",
            Self::UnderAppeal => "UNDER_APPEAL",
            Self::Transferred => "TRANSFERRED",
            Self::LicenseRecorded => "LICENSE_RECORDED",
        }
    }

    /// No further prosecution is expected once a patent reaches this code.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Lapsed | Self::Withdrawn | Self::Rejected | Self::Expired | Self::Revoked
        )
    }

    /// The patent is pending or in force.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for UnifiedStatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnifiedStatusCode {
    type Err = ValidationError;

    /// Parse from the identifier produced by [`UnifiedStatusCode::as_str()`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|code| code.as_str() == s.trim())
            .ok_or_else(|| ValidationError::UnknownStatusCode(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_codes_count() {
        assert_eq!(UnifiedStatusCode::all().len(), UNIFIED_STATUS_CODE_COUNT);
    }

    #[test]
    fn terminal_and_active_are_mutually_exclusive() {
        for code in UnifiedStatusCode::all() {
            assert_ne!(code.is_terminal(), code.is_active(), "{code}");
        }
    }

    #[test]
    fn exactly_five_terminal_codes() {
        let terminal = UnifiedStatusCode::all()
            .iter()
            .filter(|c| c.is_terminal())
            .count();
        assert_eq!(terminal, 5);
    }

    #[test]
    fn as_str_roundtrip() {
        for code in UnifiedStatusCode::all() {
            let parsed: UnifiedStatusCode = code.as_str().parse().unwrap();
            assert_eq!(*code, parsed);
        }
    }

    #[test]
    fn from_str_rejects_unknown() {
        assert!("PENDING".parse::<UnifiedStatusCode>().is_err());
        assert!("granted".parse::<UnifiedStatusCode>().is_err());
        assert!("".parse::<UnifiedStatusCode>().is_err());
    }

    #[test]
    fn serde_format_matches_as_str() {
        for code in UnifiedStatusCode::all() {
            let json = serde_json::to_string(code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn exhaustive_match_compiles() {
        fn office_wording(c: &UnifiedStatusCode) -> &'static str {
            match c {
                UnifiedStatusCode::Filed => "application filed",
                UnifiedStatusCode::Published => "laid open",
                UnifiedStatusCode::UnderExamination => "under examination",
                UnifiedStatusCode::Granted => "granted",
                UnifiedStatusCode::Lapsed => "lapsed",
                UnifiedStatusCode::Withdrawn => "withdrawn",
                UnifiedStatusCode::Rejected => "refused",
                UnifiedStatusCode::Expired => "term expired",
                UnifiedStatusCode::Revoked => "revoked",
                UnifiedStatusCode::UnderAppeal => "appeal pending",
                UnifiedStatusCode::Transferred => "assignment recorded",
                UnifiedStatusCode::LicenseRecorded => "license recorded",
            }
        }
        for c in UnifiedStatusCode::all() {
            assert!(!office_wording(c).is_empty());
        }
    }
}
