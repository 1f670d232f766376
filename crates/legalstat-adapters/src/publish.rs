//! Event publishers: one that writes change events to the log, one that
//! keeps them for assertions.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use legalstat_core::{EventPublisher, PortError};
use parking_lot::Mutex;
use serde::Serialize;

/// Publishes by emitting an `info` event on the `legalstat::events` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &serde_json::Value,
    ) -> Result<(), PortError> {
        tracing::info!(target: "legalstat::events", topic, key, payload = %payload, "event published");
        Ok(())
    }
}

/// One captured publication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedEvent {
    pub topic: String,
    pub key: String,
    pub payload: serde_json::Value,
}

/// Keeps every publication in memory. Can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<PublishedEvent>>,
    fail: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PublishedEvent> {
        self.events.lock().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &serde_json::Value,
    ) -> Result<(), PortError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("event bus unreachable".into()));
        }
        self.events.lock().push(PublishedEvent {
            topic: topic.to_string(),
            key: key.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }
}
