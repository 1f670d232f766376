//! # legalstat-core: Foundational Types for Legal-Status Tracking
//!
//! Shared vocabulary for the legal-status synchronization engine. Every
//! other crate in the workspace depends on `legalstat-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `PatentId`, `PortfolioId`,
//!    `JurisdictionCode` validate at construction; `SubscriptionId` and
//!    `EventId` are UUID-backed and always valid. No bare strings cross a
//!    port boundary as identifiers.
//!
//! 2. **Single `UnifiedStatusCode` enum.** Twelve variants, exhaustive
//!    `match` everywhere. Every code is either terminal or active, never
//!    both.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] is UTC with seconds precision,
//!    so effective dates compare exactly across local and remote records.
//!
//! 4. **Ports are traits.** Repository, portfolio listing, remote authority,
//!    cache, event publication and metrics are consumed through the object-
//!    safe traits in [`ports`]. Concrete backends live in
//!    `legalstat-adapters`.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `legalstat-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod cache_keys;
pub mod cancel;
pub mod error;
pub mod identity;
pub mod ports;
pub mod record;
pub mod status;
pub mod subscription;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use cancel::CancellationToken;
pub use error::{PortError, ValidationError};
pub use identity::{EventId, JurisdictionCode, PatentId, PortfolioId, SubscriptionId};
pub use ports::{
    EventPublisher, MetricsSink, PortfolioDirectory, RemoteStatusSource, StatusCache,
    StatusRepository,
};
pub use record::{
    HistoryQuery, LocalStatusRecord, PatentSummary, RemoteStatusRecord, StatusChangeEvent,
    StatusHistoryEvent,
};
pub use status::{UnifiedStatusCode, UNIFIED_STATUS_CODE_COUNT};
pub use subscription::{NotificationChannel, SubscribeRequest, Subscription};
pub use temporal::Timestamp;
