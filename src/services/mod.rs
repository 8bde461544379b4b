//! # Named services and their manager.
//!
//! A [`Service`] is a coarser-grained, independently startable subsystem; the
//! reader-hosting [`ReaderService`] is one instance. The [`ServiceManager`]
//! registers services, validates their dependency graph, starts them in
//! dependency order, routes reload requests, and stops everything in reverse
//! order on shutdown.

mod manager;
mod reader_service;
mod service;

pub use manager::{ReloadHandle, ServiceManager};
pub use reader_service::{ReaderService, ReaderServiceBuilder};
pub use service::{Service, ServiceRef};
