//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [reload-requested] name=readers
//! [added] reader=cdr1 group=/var/spool/in
//! [skipped] reader=cdr9 err="unsupported format: <*http_json>"
//! [removed] reader=cdr2 group=/var/spool/in
//! [reconciled] service=readers added=1 removed=1
//! [service-started] service=readers
//! [shutdown-requested]
//! [all-stopped-within-grace]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Prints human-readable event
/// descriptions to stdout for debugging and demonstration purposes.
///
/// Not intended for production use - implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
#[derive(Default)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::ReloadRequested => {
                println!("[reload-requested] name={:?}", e.name);
            }
            EventKind::ReconcileCompleted => {
                println!(
                    "[reconciled] service={:?} added={:?} removed={:?}",
                    e.name, e.added, e.removed
                );
            }
            EventKind::ReconcileAborted => {
                println!("[reconcile-aborted] reader={:?} err={:?}", e.name, e.reason);
            }
            EventKind::ReaderAdded => {
                println!("[added] reader={:?} group={:?}", e.name, e.group);
            }
            EventKind::ReaderRemoved => {
                println!("[removed] reader={:?} group={:?}", e.name, e.group);
            }
            EventKind::ReaderSkipped => {
                println!("[skipped] reader={:?} err={:?}", e.name, e.reason);
            }
            EventKind::ReaderExhausted => {
                println!("[exhausted] reader={:?}", e.name);
            }
            EventKind::ReaderFailed => {
                println!("[failed] reader={:?} err={:?}", e.name, e.reason);
            }
            EventKind::ServiceStarted => {
                println!("[service-started] service={:?}", e.name);
            }
            EventKind::ServiceStopped => {
                println!("[service-stopped] service={:?}", e.name);
            }
            EventKind::ServiceReloaded => {
                println!("[service-reloaded] service={:?}", e.name);
            }
            EventKind::ServiceFailed => {
                println!("[service-failed] service={:?} err={:?}", e.name, e.reason);
            }
            EventKind::ServiceSkipped => {
                println!("[service-skipped] service={:?} dep={:?}", e.name, e.reason);
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested]");
            }
            EventKind::AllStoppedWithin => {
                println!("[all-stopped-within-grace]");
            }
            EventKind::GraceExceeded => {
                println!("[grace-exceeded]");
            }
            EventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] name={:?} info={:?}", e.name, e.reason);
            }
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] name={:?} why={:?}", e.name, e.reason);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
