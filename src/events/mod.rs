//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the reconciler, registry,
//! reader actors, service manager, and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Reconciler`, `ReaderRegistry`, `ReaderActor`,
//!   `ServiceManager`, `ShutdownCoordinator` owners, `SubscriberSet` workers
//!   (overflow/panic).
//! - **Consumers**: the subscriber listener spawned by
//!   [`SubscriberSet::listen`](crate::SubscriberSet::listen), plus any ad-hoc
//!   [`Bus::subscribe`] receiver (tests use these heavily).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
