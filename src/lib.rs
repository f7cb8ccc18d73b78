//! # dxlfabric
//!
//! Broker registry, state-sync protocol, and tenant metrics engine for a
//! federated publish/subscribe fabric.
//!
//! Each broker in the fabric keeps its own copy of a registry describing
//! every other broker it knows about — identity, bridge connections, and
//! subscribed topics — and reconciles that copy against periodic
//! state-sync events from its peers. This crate implements that registry,
//! the wire messages the sync protocol exchanges, and the per-tenant
//! admission-control counters that sit alongside it. Transport, wire
//! serialization format, and authorization are all external collaborator
//! concerns, reached through the [`Dispatcher`] trait and the
//! format-agnostic [`protocol::codec::Node`] tree.
//!
//! ## Quick Start
//!
//! ```rust
//! use dxlfabric::{BrokerDescriptor, BrokerId, BrokerRegistry, Config};
//!
//! let mut registry = BrokerRegistry::new(Config::default());
//! registry
//!     .set_local_broker(BrokerDescriptor::new(BrokerId::from("broker-1"), 0, 15))
//!     .unwrap();
//! assert!(registry.contains(&BrokerId::from("broker-1")));
//! ```
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`BrokerId`] | Unique identifier for a broker |
//! | [`BrokerDescriptor`] | A broker's identity and routing properties |
//! | [`BrokerState`] | Connections, subscriptions, and liveness for one broker |
//! | [`BrokerRegistry`] | The fabric-wide table of known broker states |
//! | [`TenantMetrics`] | Per-tenant admission control and usage accounting |
//! | [`Observer`] | Synchronous callback for registry mutations |
//! | [`protocol::Dispatcher`] | Seam between this crate and the host's transport |
//!
//! ## Features
//!
//! - **`serde`** (default) — `serde_json`-backed conversion for
//!   [`protocol::codec::Node`]

mod broker_id;
mod broker_state;
mod config;
mod connections;
mod descriptor;
mod error;
mod finalize_filter;
mod maintenance;
mod observer;
mod registry;
mod subscriptions;
mod tenant_metrics;

pub mod protocol;

#[cfg(test)]
mod testing;

pub use broker_id::BrokerId;
pub use broker_state::BrokerState;
pub use config::Config;
pub use descriptor::BrokerDescriptor;
pub use error::Error;
pub use finalize_filter::{FinalizedMessage, should_raise_subscriber_not_found};
pub use maintenance::run_maintenance_loop;
pub use observer::{ChangeKind, Observer};
pub use protocol::Dispatcher;
pub use registry::BrokerRegistry;
pub use tenant_metrics::TenantMetrics;

pub type Result<T = ()> = std::result::Result<T, Error>;
