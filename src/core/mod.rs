//! Runtime core: reconciliation and reader lifecycle.
//!
//! Internal modules:
//! - [`registry`]: lock-guarded mapping of ingestion groups to live readers;
//! - [`actor`]: drives one reader (step loop) until cancel/exhaust/failure;
//! - [`reconciler`]: diffs configuration against the registry and applies
//!   additions/removals, one strictly-serialized pass per reload trigger.

mod actor;
mod reconciler;
mod registry;

pub use reconciler::{Reconciler, ReloadSignal};
pub use registry::ReaderRegistry;
