//! # Status-Change Subscriptions
//!
//! A subscription asks for notification when patents, or every patent in a
//! portfolio, move into one of a set of unified status codes. Subscriptions
//! are deactivated, never deleted, so the audit trail of who was notified
//! survives.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{PatentId, PortfolioId, SubscriptionId};
use crate::status::UnifiedStatusCode;
use crate::temporal::Timestamp;

/// Delivery channel for status-change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Webhook,
    Sms,
    InApp,
}

impl std::fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Email => "email",
            Self::Webhook => "webhook",
            Self::Sms => "sms",
            Self::InApp => "in_app",
        };
        f.write_str(s)
    }
}

/// Request to create a subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub patent_ids: Vec<PatentId>,
    #[serde(default)]
    pub portfolio_id: Option<PortfolioId>,
    /// Empty means "every status".
    #[serde(default)]
    pub status_filters: Vec<UnifiedStatusCode>,
    pub channels: Vec<NotificationChannel>,
    pub recipient: String,
}

impl SubscribeRequest {
    /// Require a target, at least one channel, and a recipient.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.patent_ids.is_empty() && self.portfolio_id.is_none() {
            return Err(ValidationError::MissingSubscriptionTarget);
        }
        if self.channels.is_empty() {
            return Err(ValidationError::MissingChannel);
        }
        if self.recipient.trim().is_empty() {
            return Err(ValidationError::MissingRecipient);
        }
        Ok(())
    }
}

/// A persisted subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub active: bool,
    pub created_at: Timestamp,
    pub patent_ids: Vec<PatentId>,
    pub portfolio_id: Option<PortfolioId>,
    pub status_filters: Vec<UnifiedStatusCode>,
    pub channels: Vec<NotificationChannel>,
    pub recipient: String,
}

impl Subscription {
    /// Materialize an active subscription from a validated request.
    pub fn from_request(request: SubscribeRequest, created_at: Timestamp) -> Self {
        Self {
            id: SubscriptionId::new(),
            active: true,
            created_at,
            patent_ids: request.patent_ids,
            portfolio_id: request.portfolio_id,
            status_filters: request.status_filters,
            channels: request.channels,
            recipient: request.recipient.trim().to_string(),
        }
    }

    /// Whether a transition of `patent_id` (member of `portfolio_id`, if
    /// known) into `to_status` should be delivered to this subscriber.
    pub fn matches(
        &self,
        patent_id: &PatentId,
        portfolio_id: Option<&PortfolioId>,
        to_status: UnifiedStatusCode,
    ) -> bool {
        if !self.active {
            return false;
        }
        let targeted = self.patent_ids.contains(patent_id)
            || matches!(
                (&self.portfolio_id, portfolio_id),
                (Some(mine), Some(theirs)) if mine == theirs
            );
        targeted && (self.status_filters.is_empty() || self.status_filters.contains(&to_status))
    }
}
