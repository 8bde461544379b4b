//! # Runtime events emitted by the reconciler, registry, actors, and manager.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Reconciliation events**: reload triggers and pass outcomes
//! - **Reader events**: per-reader lifecycle (added, removed, skipped, failed)
//! - **Service events**: service lifecycle transitions
//! - **Shutdown events**: coordinated shutdown progress
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! subject name (reader id or service name), the ingestion group, and a
//! human-readable reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore exact order when events are delivered
//! out of order.
//!
//! ## Example
//! ```
//! use ingestvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ReaderSkipped)
//!     .with_name("cdr-http")
//!     .with_group("/var/spool/in")
//!     .with_reason("unsupported format: <*http_json>");
//!
//! assert_eq!(ev.kind, EventKind::ReaderSkipped);
//! assert_eq!(ev.name.as_deref(), Some("cdr-http"));
//! assert_eq!(ev.reason.as_deref(), Some("unsupported format: <*http_json>"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Reconciliation events ===
    /// A reload was requested for a reader service or named section.
    ///
    /// Sets: `name` (service/section), `at`, `seq`.
    ReloadRequested,

    /// One reconciliation pass finished.
    ///
    /// Sets: `name` (service), `added`, `removed`, `at`, `seq`.
    ReconcileCompleted,

    /// A reconciliation pass was aborted on a registry invariant violation.
    ///
    /// Sets: `name` (reader id), `reason`, `at`, `seq`.
    ReconcileAborted,

    // === Reader events ===
    /// Reader was constructed, initialized, and registered.
    ///
    /// Sets: `name` (reader id), `group`, `at`, `seq`.
    ReaderAdded,

    /// Reader was closed and deregistered.
    ///
    /// Sets: `name` (reader id), `group`, `at`, `seq`.
    ReaderRemoved,

    /// A configured reader could not be built or initialized; the entry was
    /// skipped and the pass continued.
    ///
    /// Sets: `name` (reader id), `group`, `reason`, `at`, `seq`.
    ReaderSkipped,

    /// Reader ran out of input (end-of-input sentinel); its driving loop exited.
    ///
    /// Sets: `name` (reader id), `at`, `seq`.
    ReaderExhausted,

    /// Reader hit a fatal step error; it was closed but stays registered
    /// until the next reconciliation pass.
    ///
    /// Sets: `name` (reader id), `reason`, `at`, `seq`.
    ReaderFailed,

    // === Service events ===
    /// Service reported Running.
    ///
    /// Sets: `name` (service), `at`, `seq`.
    ServiceStarted,

    /// Service stopped.
    ///
    /// Sets: `name` (service), `at`, `seq`.
    ServiceStopped,

    /// Service swapped its configuration in place.
    ///
    /// Sets: `name` (service), `at`, `seq`.
    ServiceReloaded,

    /// Service start/stop/reload failed; other services are unaffected.
    ///
    /// Sets: `name` (service), `reason`, `at`, `seq`.
    ServiceFailed,

    /// Service was not started because a dependency is not running.
    ///
    /// Sets: `name` (service), `reason` (dependency), `at`, `seq`.
    ServiceSkipped,

    // === Shutdown events ===
    /// Shutdown was triggered.
    ///
    /// Sets: `at`, `seq`.
    ShutdownRequested,

    /// All tracked loops exited within the configured grace period.
    ///
    /// Sets: `at`, `seq`.
    AllStoppedWithin,

    /// Grace period exceeded; remaining loops were abandoned.
    ///
    /// Sets: `at`, `seq`.
    GraceExceeded,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `name` (subscriber), `reason`, `at`, `seq`.
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `name` (subscriber), `reason`, `at`, `seq`.
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Subject name: reader id, service name, or subscriber name.
    pub name: Option<Arc<str>>,
    /// Ingestion group (path) the subject belongs to, if applicable.
    pub group: Option<Arc<str>>,
    /// Human-readable reason (errors, skip causes, etc.).
    pub reason: Option<Arc<str>>,
    /// Readers added by a reconciliation pass.
    pub added: Option<u32>,
    /// Readers removed by a reconciliation pass.
    pub removed: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            name: None,
            group: None,
            reason: None,
            added: None,
            removed: None,
        }
    }

    /// Attaches a subject name (reader id, service, or subscriber).
    #[inline]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches the ingestion group (path).
    #[inline]
    pub fn with_group(mut self, group: impl Into<Arc<str>>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches reconciliation pass counters.
    #[inline]
    pub fn with_counts(mut self, added: u32, removed: u32) -> Self {
        self.added = Some(added);
        self.removed = Some(removed);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub(crate) fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_name(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub(crate) fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_name(subscriber)
            .with_reason(info)
    }
}
