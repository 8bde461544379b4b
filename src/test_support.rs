//! Shared doubles for in-crate tests: a reader that never produces on its
//! own, a factory that builds it, and per-id init/close counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::ReaderError;
use crate::readers::{Reader, ReaderFactory, ReaderParams, ReaderProfile, ReaderRef, Record};

/// Per-reader-id `(inits, closes)` counters shared across a test.
#[derive(Clone, Default)]
pub(crate) struct CounterBook {
    counts: Arc<Mutex<HashMap<String, (usize, usize)>>>,
}

impl CounterBook {
    pub(crate) fn inits(&self, id: &str) -> usize {
        self.counts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .map_or(0, |c| c.0)
    }

    pub(crate) fn closes(&self, id: &str) -> usize {
        self.counts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .map_or(0, |c| c.1)
    }

    fn record_init(&self, id: &str) {
        self.counts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(id.to_string())
            .or_default()
            .0 += 1;
    }

    fn record_close(&self, id: &str) {
        self.counts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(id.to_string())
            .or_default()
            .1 += 1;
    }
}

/// Reader whose `step` never completes; lifecycle is everything.
pub(crate) struct MockReader {
    id: String,
    fail_init: bool,
    book: CounterBook,
    processed: AtomicI64,
}

#[async_trait]
impl Reader for MockReader {
    fn id(&self) -> &str {
        &self.id
    }

    async fn init(&self) -> Result<(), ReaderError> {
        if self.fail_init {
            return Err(ReaderError::Init {
                reason: "mock init failure".to_string(),
            });
        }
        self.book.record_init(&self.id);
        Ok(())
    }

    async fn step(&self) -> Result<Record, ReaderError> {
        std::future::pending::<()>().await;
        Err(ReaderError::Exhausted)
    }

    fn processed(&self) -> i64 {
        self.processed.load(Ordering::Relaxed)
    }

    async fn close(&self) -> Result<(), ReaderError> {
        self.book.record_close(&self.id);
        Ok(())
    }
}

/// A successfully-initialized mock reader counted in `book`.
pub(crate) fn mock_reader(id: &str, book: &CounterBook) -> ReaderRef {
    book.record_init(id);
    Arc::new(MockReader {
        id: id.to_string(),
        fail_init: false,
        book: book.clone(),
        processed: AtomicI64::new(0),
    })
}

/// Enabled `*mock` profile in the given group.
pub(crate) fn mock_profile(id: &str, group: &str) -> ReaderProfile {
    ReaderProfile {
        id: id.to_string(),
        enabled: true,
        group: group.to_string(),
        format: "*mock".to_string(),
        params: ReaderParams::default(),
    }
}

/// Factory for `*mock` profiles; `params.source == "fail-init"` makes the
/// reader's init fail.
pub(crate) struct MockFactory {
    book: CounterBook,
}

impl MockFactory {
    pub(crate) fn new(book: &CounterBook) -> Self {
        Self { book: book.clone() }
    }
}

impl ReaderFactory for MockFactory {
    fn build(&self, profile: &ReaderProfile) -> Result<ReaderRef, ReaderError> {
        if profile.format != "*mock" {
            return Err(ReaderError::Unsupported {
                format: profile.format.clone(),
            });
        }
        Ok(Arc::new(MockReader {
            id: profile.id.clone(),
            fail_init: profile.params.source == "fail-init",
            book: self.book.clone(),
            processed: AtomicI64::new(0),
        }))
    }
}
