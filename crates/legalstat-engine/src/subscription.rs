//! Status-change subscription registry.
//!
//! A thin persistence wrapper. Unsubscribing an unknown ID is
//! [`EngineError::NotFound`]; unsubscribing an inactive one succeeds.

use legalstat_core::{
    CancellationToken, PortError, SubscribeRequest, Subscription, SubscriptionId, Timestamp,
    ValidationError,
};

use crate::engine::{guarded, LegalStatusEngine};
use crate::error::EngineError;

impl LegalStatusEngine {
    /// Validate and persist a new active subscription.
    #[tracing::instrument(skip_all, fields(recipient = %request.recipient))]
    pub async fn subscribe(
        &self,
        request: SubscribeRequest,
        token: &CancellationToken,
    ) -> Result<Subscription, EngineError> {
        request.validate()?;
        let subscription = Subscription::from_request(request, Timestamp::now());
        guarded(
            token,
            "save_subscription",
            self.ports().repository.save_subscription(&subscription),
        )
        .await?;
        tracing::info!(subscription_id = %subscription.id, "subscription created");
        Ok(subscription)
    }

    /// Deactivate a subscription by ID.
    #[tracing::instrument(skip(self, token))]
    pub async fn unsubscribe(
        &self,
        subscription_id: &str,
        token: &CancellationToken,
    ) -> Result<(), EngineError> {
        let id: SubscriptionId = subscription_id
            .trim()
            .parse()
            .map_err(|_| ValidationError::InvalidSubscriptionId(subscription_id.to_string()))?;
        match guarded(
            token,
            "deactivate_subscription",
            self.ports().repository.deactivate_subscription(&id),
        )
        .await
        {
            Ok(()) => Ok(()),
            Err(EngineError::Internal {
                source: PortError::NotFound(_),
                ..
            }) => Err(EngineError::NotFound(format!("subscription {id}"))),
            Err(e) => Err(e),
        }
    }
}
