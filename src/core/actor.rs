//! # ReaderActor: drives a single reader.
//!
//! Steps the reader until cancellation, end-of-input, or a fatal error.
//!
//! ## Event flow
//! ```text
//! loop {
//!   ├─► step()
//!   │     ├─ Ok(record)         → forward to delivery channel (if any)
//!   │     ├─ Err(Exhausted)     → publish ReaderExhausted, exit
//!   │     └─ Err(fatal)         → close reader, publish ReaderFailed, exit
//!   └─ exit on cancellation (registry removal or shutdown)
//! }
//! ```
//!
//! ## Rules
//! - A fatal step error closes the reader but does **not** deregister it;
//!   removal only ever happens through a reconciliation pass.
//! - Cancellation during a step drops the in-flight step; readers keep their
//!   step path cancel-safe.
//! - The actor never touches the registry lock.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event, EventKind};
use crate::readers::{ReaderRef, Record};

/// Drives one reader's step loop and publishes its lifecycle events.
pub(crate) struct ReaderActor {
    reader: ReaderRef,
    bus: Bus,
    sink: Option<mpsc::Sender<Record>>,
}

impl ReaderActor {
    pub(crate) fn new(reader: ReaderRef, bus: Bus, sink: Option<mpsc::Sender<Record>>) -> Self {
        Self { reader, bus, sink }
    }

    /// Runs until cancellation, exhaustion, or a fatal error.
    pub(crate) async fn run(self, token: CancellationToken) {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                res = self.reader.step() => match res {
                    Ok(record) => {
                        if let Some(tx) = &self.sink {
                            // Delivery target gone: records are dropped, the
                            // reader keeps its place until reconfigured.
                            let _ = tx.send(record).await;
                        }
                    }
                    Err(e) if e.is_exhausted() => {
                        self.bus.publish(
                            Event::new(EventKind::ReaderExhausted).with_name(self.reader.id()),
                        );
                        break;
                    }
                    Err(e) => {
                        if token.is_cancelled() {
                            // Removal closed the reader under us; not a failure.
                            break;
                        }
                        self.bus.publish(
                            Event::new(EventKind::ReaderFailed)
                                .with_name(self.reader.id())
                                .with_reason(e.to_string()),
                        );
                        let _ = self.reader.close().await;
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReaderError;
    use crate::readers::Reader;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Yields `remaining` records, then exhausts (or fails, per `fail`).
    struct ScriptedReader {
        remaining: AtomicI64,
        processed: AtomicI64,
        fail: bool,
        closes: AtomicI64,
    }

    impl ScriptedReader {
        fn new(records: i64, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                remaining: AtomicI64::new(records),
                processed: AtomicI64::new(0),
                fail,
                closes: AtomicI64::new(0),
            })
        }
    }

    #[async_trait]
    impl Reader for ScriptedReader {
        fn id(&self) -> &str {
            "scripted"
        }

        async fn init(&self) -> Result<(), ReaderError> {
            Ok(())
        }

        async fn step(&self) -> Result<Record, ReaderError> {
            // Keep the loop cooperative so cancellation gets polled.
            tokio::time::sleep(Duration::from_millis(1)).await;
            if self.remaining.fetch_sub(1, Ordering::SeqCst) <= 0 {
                if self.fail {
                    return Err(ReaderError::Read {
                        reason: "boom".to_string(),
                    });
                }
                return Err(ReaderError::Exhausted);
            }
            self.processed.fetch_add(1, Ordering::SeqCst);
            Ok(Record {
                source: Arc::from("scripted"),
                fields: vec!["f".to_string()],
            })
        }

        fn processed(&self) -> i64 {
            self.processed.load(Ordering::SeqCst)
        }

        async fn close(&self) -> Result<(), ReaderError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_forwards_records_then_reports_exhaustion() {
        let bus = Bus::new(64);
        let mut events = bus.subscribe();
        let (tx, mut rx) = mpsc::channel(8);

        let reader = ScriptedReader::new(2, false);
        let actor = ReaderActor::new(reader.clone(), bus, Some(tx));
        actor.run(CancellationToken::new()).await;

        assert_eq!(rx.recv().await.unwrap().fields, vec!["f".to_string()]);
        assert!(rx.recv().await.is_some());
        assert_eq!(reader.processed(), 2);

        let ev = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ev.kind, EventKind::ReaderExhausted);
        // Exhaustion is a sentinel, not a failure: the reader is not closed here.
        assert_eq!(reader.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fatal_error_closes_and_reports() {
        let bus = Bus::new(64);
        let mut events = bus.subscribe();

        let reader = ScriptedReader::new(1, true);
        let actor = ReaderActor::new(reader.clone(), bus, None);
        actor.run(CancellationToken::new()).await;

        let mut saw_failed = false;
        while let Ok(Ok(ev)) =
            tokio::time::timeout(Duration::from_millis(200), events.recv()).await
        {
            if ev.kind == EventKind::ReaderFailed {
                assert_eq!(ev.name.as_deref(), Some("scripted"));
                assert_eq!(ev.reason.as_deref(), Some("read failed: boom"));
                saw_failed = true;
                break;
            }
        }
        assert!(saw_failed);
        assert_eq!(reader.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_exits_without_failure_event() {
        let bus = Bus::new(64);
        let mut events = bus.subscribe();

        let reader = ScriptedReader::new(i64::MAX, false);
        let token = CancellationToken::new();
        let actor = ReaderActor::new(reader, bus, None);

        let handle = tokio::spawn(actor.run(token.clone()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
        handle.await.unwrap();

        while let Ok(Ok(ev)) =
            tokio::time::timeout(Duration::from_millis(100), events.recv()).await
        {
            assert_ne!(ev.kind, EventKind::ReaderFailed);
            assert_ne!(ev.kind, EventKind::ReaderExhausted);
        }
    }
}
