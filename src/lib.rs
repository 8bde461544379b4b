//! # ingestvisor
//!
//! **ingestvisor** keeps a dynamic set of long-running ingestion readers
//! continuously synchronized with a mutable configuration, and generalizes
//! the same discipline to whole subsystems via a service manager with
//! dependency ordering and coordinated shutdown.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ConfigSource ──(profiles snapshot)──┐     ReloadSignal (edge-triggered)
//!                                       ▼            │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ReaderService (one Service instance)                           │
//! │  - Reconciler: diff configured vs live, remove then add         │
//! │  - ReaderRegistry: group → live readers (exclusive lock)        │
//! └──────┬──────────────────┬──────────────────┬────────────────────┘
//!        ▼                  ▼                  ▼
//!    ┌───────────┐     ┌───────────┐     ┌───────────┐
//!    │ReaderActor│     │ReaderActor│     │ReaderActor│   (one per reader)
//!    │ step loop │     │ step loop │     │ step loop │
//!    └─────┬─────┘     └─────┬─────┘     └─────┬─────┘
//!          └── publish ──────┴── Events ───────┘
//!                             ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Bus (broadcast) ──► SubscriberSet ──► LogWriter / custom subs  │
//! └─────────────────────────────────────────────────────────────────┘
//!
//!   ServiceManager: add_services (cycle check) → start_services (dep
//!   order) → reload routing → stop_services; one layer above, applying
//!   the same start/stop discipline to whole Services.
//!
//!   ShutdownCoordinator: fire-once broadcast + counting join with grace.
//! ```
//!
//! ### Reconciliation pass
//! ```text
//! trigger ─► profiles() filtered to enabled, indexed by id
//!        ─► registry.snapshot(), indexed by id
//!        ─► removals first (close returns before any add), then additions
//!        ─► unchanged ids untouched; bad entries skipped; pass continues
//! ```
//!
//! ## Features
//! | Area            | Description                                             | Key types / traits                    |
//! |-----------------|---------------------------------------------------------|---------------------------------------|
//! | **Readers**     | Pluggable record sources selected by format.            | [`Reader`], [`ReaderFactory`]         |
//! | **Reconciler**  | Diff-and-apply between configuration and live readers.  | [`Reconciler`], [`ReloadSignal`]      |
//! | **Registry**    | Lock-guarded ownership of live readers.                 | [`ReaderRegistry`]                    |
//! | **Services**    | Named subsystems with dependency-ordered lifecycle.     | [`Service`], [`ServiceManager`]       |
//! | **Shutdown**    | Broadcast-once signal plus counting join with grace.    | [`ShutdownCoordinator`]               |
//! | **Observability**| Typed events fanned out to subscribers.                | [`Event`], [`Bus`], [`Subscribe`]     |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use ingestvisor::{
//!     Bus, Config, ConfigSource, ReaderParams, ReaderProfile, ReaderService,
//!     ServiceManager, SharedProfiles, ShutdownCoordinator,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default();
//!     let bus = Bus::new(cfg.bus_capacity);
//!     let shutdown = ShutdownCoordinator::new();
//!
//!     let profiles = SharedProfiles::new(vec![ReaderProfile {
//!         id: "cdr1".into(),
//!         enabled: true,
//!         group: "/var/spool/in".into(),
//!         format: "*file_csv".into(),
//!         params: ReaderParams {
//!             source: "/var/spool/in/cdr1.csv".into(),
//!             separator: ',',
//!         },
//!     }]);
//!
//!     let readers = ReaderService::builder(
//!         "readers",
//!         Arc::clone(&profiles) as Arc<dyn ConfigSource>,
//!         bus.clone(),
//!         shutdown.clone(),
//!     )
//!     .build();
//!
//!     let manager = ServiceManager::new(&cfg, bus.clone(), shutdown.clone());
//!     manager.add_services(vec![readers]).await?;
//!     manager.start_services().await?;
//!     manager.clone().spawn_reload_listener();
//!
//!     ingestvisor::wait_for_shutdown_signal().await?;
//!     manager.shutdown_with_grace(cfg.grace).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod readers;
mod services;
mod shutdown;
mod subscribers;

#[cfg(test)]
mod test_support;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{ReaderRegistry, Reconciler, ReloadSignal};
pub use error::{ReaderError, RegistryError, RuntimeError, ServiceError};
pub use events::{Bus, Event, EventKind};
pub use readers::{
    ConfigSource, FileCsvReader, FormatFactory, Reader, ReaderFactory, ReaderParams,
    ReaderProfile, ReaderRef, Record, SharedProfiles, FORMAT_FILE_CSV,
};
pub use services::{
    ReaderService, ReaderServiceBuilder, ReloadHandle, Service, ServiceManager, ServiceRef,
};
pub use shutdown::{wait_for_shutdown_signal, ShutdownCoordinator};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
