//! Error types used by the ingestvisor runtime, readers, and services.
//!
//! This module defines the error families of the crate:
//!
//! - [`RuntimeError`] — errors raised by the coordination runtime itself.
//! - [`ReaderError`] — errors raised by reader construction and execution.
//! - [`ServiceError`] — errors raised by the service lifecycle API.
//! - [`RegistryError`] — registry invariant violations (programming errors).
//!
//! Types provide helper methods (`as_label`) for logging/metrics and
//! utilities such as [`ReaderError::is_exhausted`].

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the coordination runtime.
///
/// These represent failures in the orchestration machinery itself, such as a
/// shutdown sequence exceeding its grace period.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some loops remained stuck and were abandoned.
    #[error("shutdown grace {grace:?} exceeded; abandoning remaining loops")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// # Errors produced by reader construction and execution.
///
/// [`ReaderError::Exhausted`] is the end-of-input sentinel and is not fatal;
/// every other variant is fatal for the reader that produced it.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ReaderError {
    /// Input source is exhausted (end-of-input sentinel, not a failure).
    #[error("input exhausted")]
    Exhausted,

    /// Reader was closed; no further steps are possible.
    #[error("reader closed")]
    Closed,

    /// No constructor registered for the profile's format discriminator.
    #[error("unsupported format: <{format}>")]
    Unsupported {
        /// The unrecognized format discriminator.
        format: String,
    },

    /// Reader initialization failed; the reader holds no resources.
    #[error("init failed: {reason}")]
    Init {
        /// The underlying failure message.
        reason: String,
    },

    /// A step failed after successful init; fatal for this reader.
    #[error("read failed: {reason}")]
    Read {
        /// The underlying failure message.
        reason: String,
    },
}

impl ReaderError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ReaderError::Exhausted => "reader_exhausted",
            ReaderError::Closed => "reader_closed",
            ReaderError::Unsupported { .. } => "reader_unsupported_format",
            ReaderError::Init { .. } => "reader_init_failed",
            ReaderError::Read { .. } => "reader_read_failed",
        }
    }

    /// True for the end-of-input sentinel.
    ///
    /// # Example
    /// ```
    /// use ingestvisor::ReaderError;
    ///
    /// assert!(ReaderError::Exhausted.is_exhausted());
    /// assert!(!ReaderError::Closed.is_exhausted());
    /// ```
    pub fn is_exhausted(&self) -> bool {
        matches!(self, ReaderError::Exhausted)
    }
}

/// # Errors produced by the service lifecycle API.
///
/// Lifecycle misuse (double start, stop while stopped) is returned
/// synchronously to the caller and never escalated to a crash.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServiceError {
    /// `start()` was called on a service that is already running.
    #[error("service already running")]
    AlreadyRunning,

    /// `stop()` was called on a service that is not running.
    #[error("service not running")]
    NotRunning,

    /// The named service is not registered with the manager.
    #[error("unknown service: <{name}>")]
    UnknownService {
        /// The unregistered service name.
        name: String,
    },

    /// A service declares a dependency that is not registered.
    #[error("service <{service}> depends on unknown service <{dependency}>")]
    UnknownDependency {
        /// The dependent service.
        service: String,
        /// The missing dependency name.
        dependency: String,
    },

    /// The dependency graph contains a cycle; nothing was registered.
    #[error("service dependency cycle: {path}")]
    DependencyCycle {
        /// Human-readable cycle path, e.g. `a -> b -> a`.
        path: String,
    },

    /// A service failed to start or stop for a service-specific reason.
    #[error("service <{service}> failed: {reason}")]
    Failed {
        /// The failing service.
        service: String,
        /// The underlying failure message.
        reason: String,
    },

    /// Reload queue is full (try again later or use the async `request`).
    #[error("reload queue full")]
    ReloadQueueFull,

    /// Reload queue is closed (manager listener exited).
    #[error("reload queue closed")]
    ReloadQueueClosed,
}

impl ServiceError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::AlreadyRunning => "service_already_running",
            ServiceError::NotRunning => "service_not_running",
            ServiceError::UnknownService { .. } => "service_unknown",
            ServiceError::UnknownDependency { .. } => "service_unknown_dependency",
            ServiceError::DependencyCycle { .. } => "service_dependency_cycle",
            ServiceError::Failed { .. } => "service_failed",
            ServiceError::ReloadQueueFull => "service_reload_queue_full",
            ServiceError::ReloadQueueClosed => "service_reload_queue_closed",
        }
    }
}

/// # Registry invariant violations.
///
/// These indicate a bug in the reconciliation algorithm, not a recoverable
/// runtime condition. A correct reconciler never triggers them.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The id is already present somewhere in the registry.
    #[error("duplicate reader id <{id}> in registry")]
    DuplicateId {
        /// The offending configuration id.
        id: String,
    },
}
