//! # Reader abstraction: one configured record source.
//!
//! This module defines the [`Reader`] trait (async, closeable) and the
//! normalized [`Record`] it produces. The common handle type is
//! [`ReaderRef`], an `Arc<dyn Reader>` suitable for sharing between the
//! registry and the reader's driving loop.
//!
//! ## Rules
//! - `id()` and `processed()` are side-effect-free and safe to call
//!   concurrently with `step()` - the registry iterates readers without
//!   blocking on their I/O.
//! - `init()` either leaves the reader ready to produce records or returns an
//!   error and holds no resources.
//! - `step()` returns [`ReaderError::Exhausted`] when input runs out (not a
//!   failure); any other error is fatal for this reader.
//! - `close()` is idempotent and safe even after a failed `init()`; `step()`
//!   after `close()` returns [`ReaderError::Closed`], never panics or blocks.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ReaderError;

/// Normalized unit of work produced by a [`Reader`].
///
/// Field semantics are format-specific; the core only moves records around.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Configuration id of the reader that produced this record.
    pub source: Arc<str>,
    /// Raw field values in source order.
    pub fields: Vec<String>,
}

/// # Asynchronous, closeable record source.
///
/// A `Reader` has a stable [`id`](Reader::id) and produces one [`Record`] per
/// [`step`](Reader::step) until its input is exhausted or it is closed.
/// Format-specific parameters are captured at construction by the
/// [`ReaderFactory`](crate::ReaderFactory); [`init`](Reader::init) opens the
/// underlying source.
#[async_trait]
pub trait Reader: Send + Sync + 'static {
    /// Returns the stable configuration identifier. Side-effect-free.
    fn id(&self) -> &str;

    /// Opens the underlying source.
    ///
    /// On error the reader holds no resources and must not be registered.
    async fn init(&self) -> Result<(), ReaderError>;

    /// Produces one record.
    ///
    /// Returns [`ReaderError::Exhausted`] when input runs out; any other
    /// error is fatal for this reader and is surfaced to its driving loop.
    async fn step(&self) -> Result<Record, ReaderError>;

    /// Monotonically non-decreasing count of successful steps.
    ///
    /// Safe to call concurrently with [`step`](Reader::step).
    fn processed(&self) -> i64;

    /// Releases resources. Idempotent; safe after a failed `init`.
    async fn close(&self) -> Result<(), ReaderError>;
}

/// Shared reference to a reader.
pub type ReaderRef = Arc<dyn Reader>;
