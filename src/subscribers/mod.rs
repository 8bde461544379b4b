//! # Event subscribers for the ingestvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`]
//! fan-out, and the built-in [`LogWriter`] (feature `logging`).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Reconciler / Registry / Actors / Manager ── publish(Event) ──► Bus
//!        Bus ──► SubscriberSet::listen (one listener task)
//!                     │  (Arc-clone per subscriber)
//!                     ├──► [queue S1] ─► worker S1 ─► on_event()
//!                     ├──► [queue S2] ─► worker S2 ─► on_event()
//!                     └──► [queue SN] ─► worker SN ─► on_event()
//! ```
//!
//! ## Subscriber types
//! - **Passive subscribers** — observe and react to events (logging, metrics, alerts)
//! - **Stateful subscribers** — maintain state derived from events (tests use these)

mod set;
mod subscriber;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscriber::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
