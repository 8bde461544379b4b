//! # Global runtime configuration.
//!
//! [`Config`] defines runtime-wide behavior: shutdown grace period, event bus
//! capacity, and the capacity of the service-reload queue. Per-reader
//! configuration lives in [`ReaderProfile`](crate::ReaderProfile) and is
//! owned by the external configuration subsystem.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use ingestvisor::Config;
//!
//! let mut cfg = Config::default();
//! cfg.grace = Duration::from_secs(10);
//! cfg.bus_capacity = 256;
//!
//! assert_eq!(cfg.bus_capacity, 256);
//! ```

use std::time::Duration;

/// Global configuration for the runtime.
///
/// Controls shutdown grace, event bus capacity, and reload queue depth.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time to wait for graceful shutdown before abandoning stuck loops.
    pub grace: Duration,
    /// Capacity of the event bus channel.
    pub bus_capacity: usize,
    /// Capacity of the service manager's reload request queue.
    pub reload_queue_capacity: usize,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `grace = 30s`
    /// - `bus_capacity = 1024`
    /// - `reload_queue_capacity = 16`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            bus_capacity: 1024,
            reload_queue_capacity: 16,
        }
    }
}

impl Config {
    /// Reload queue capacity clamped to the channel's minimum of 1.
    pub(crate) fn reload_queue_clamped(&self) -> usize {
        self.reload_queue_capacity.max(1)
    }
}
