//! # Cache Key Scheme
//!
//! Stable key formats. External processes pre-warm and invalidate these
//! entries directly, so the formats must not change.
//!
//! | Key | Holds |
//! |-----|-------|
//! | `legal_status:current:<patentID>` | current-status view of one patent |
//! | `legal_status:summary:<portfolioID>` | portfolio status summary |
//! | `legal_status:notify_dedupe:<patentID>:<toStatus>` | notification dedupe marker |

use crate::identity::{PatentId, PortfolioId};
use crate::status::UnifiedStatusCode;

/// Prefix shared by every key the engine owns.
pub const PREFIX: &str = "legal_status";

/// Key of the per-patent current-status entry.
pub fn current(patent_id: &PatentId) -> String {
    format!("{PREFIX}:current:{patent_id}")
}

/// Key of the per-portfolio summary entry.
pub fn summary(portfolio_id: &PortfolioId) -> String {
    format!("{PREFIX}:summary:{portfolio_id}")
}

/// Key of the notification dedupe marker for one transition target.
pub fn notify_dedupe(patent_id: &PatentId, to_status: UnifiedStatusCode) -> String {
    format!("{PREFIX}:notify_dedupe:{patent_id}:{to_status}")
}
