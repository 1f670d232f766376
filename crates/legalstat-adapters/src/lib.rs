//! # legalstat-adapters: Port Implementations
//!
//! Concrete backends for the traits in `legalstat_core::ports`.
//!
//! | Port | Implementations |
//! |------|-----------------|
//! | `StatusRepository` | [`InMemoryStatusRepository`] |
//! | `PortfolioDirectory` | [`InMemoryPortfolioDirectory`] |
//! | `RemoteStatusSource` | [`MockRemoteStatusSource`], [`HttpRemoteStatusSource`] |
//! | `StatusCache` | [`InMemoryCache`] |
//! | `EventPublisher` | [`TracingEventPublisher`], [`RecordingPublisher`] |
//! | `MetricsSink` | [`MetricsFacadeSink`], [`RecordingMetrics`] |
//!
//! The in-memory and recording types expose failure switches and call logs
//! so engine tests can drive every error path. All types are `Send + Sync`
//! and meant to be shared as `Arc<dyn Port>`.

pub mod cache;
pub mod http;
pub mod publish;
pub mod remote;
pub mod retry;
pub mod store;
pub mod telemetry;

pub use cache::InMemoryCache;
pub use http::{HttpRemoteConfig, HttpRemoteStatusSource, HttpSourceError};
pub use publish::{PublishedEvent, RecordingPublisher, TracingEventPublisher};
pub use remote::MockRemoteStatusSource;
pub use retry::RetryPolicy;
pub use store::{InMemoryPortfolioDirectory, InMemoryStatusRepository};
pub use telemetry::{MetricSample, MetricsFacadeSink, RecordingMetrics};
