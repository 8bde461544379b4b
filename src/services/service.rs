//! # Service contract.
//!
//! The four lifecycle methods plus two read-only probes are the entire
//! surface the [`ServiceManager`](crate::ServiceManager) requires from a
//! subsystem it manages.
//!
//! ## Rules
//! - `start()` on a running service returns
//!   [`ServiceError::AlreadyRunning`](crate::ServiceError::AlreadyRunning) -
//!   double-start is a caller bug and must be surfaced, never swallowed.
//! - `reload()` swaps internal configuration in place; it does not change the
//!   running state. Turning a service on or off when its configuration
//!   toggles is the manager's job (see
//!   [`ServiceManager::reload`](crate::ServiceManager::reload)).
//! - `should_run()` reflects whether current configuration enables the
//!   service; `is_running()` reflects its actual state.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ServiceError;

/// # Named, independently startable subsystem.
///
/// Implementations keep their own internal lock; the manager never serializes
/// unrelated services against each other.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Stable service name, unique within one manager.
    fn name(&self) -> &str;

    /// Names of services that must be Running before this one starts.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// True when current configuration enables this service.
    fn should_run(&self) -> bool;

    /// True while the service is running.
    fn is_running(&self) -> bool;

    /// Starts the service.
    ///
    /// Returns [`ServiceError::AlreadyRunning`] when already running, leaving
    /// the running state unchanged.
    async fn start(&self) -> Result<(), ServiceError>;

    /// Stops the service and releases its resources.
    ///
    /// Returns [`ServiceError::NotRunning`] when not running.
    async fn stop(&self) -> Result<(), ServiceError>;

    /// Applies the current configuration in place without a restart.
    async fn reload(&self) -> Result<(), ServiceError>;
}

/// Shared reference to a service.
pub type ServiceRef = Arc<dyn Service>;
