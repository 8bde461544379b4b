//! # Reader abstractions: the worker capability set and its configuration.
//!
//! This module provides the ingestion-side types:
//! - [`Reader`] - trait for one configured record source (id/init/step/processed/close)
//! - [`ReaderRef`] - shared reference to a reader (`Arc<dyn Reader>`)
//! - [`Record`] - normalized unit of ingested work
//! - [`ReaderProfile`] / [`ReaderParams`] - one configuration entry
//! - [`ConfigSource`] / [`SharedProfiles`] - pull-snapshot configuration access
//! - [`ReaderFactory`] / [`FormatFactory`] - format-discriminated construction
//! - [`FileCsvReader`] - the built-in `*file_csv` variant

mod factory;
mod file_csv;
mod profile;
mod reader;

pub use factory::{FormatFactory, ReaderFactory, FORMAT_FILE_CSV};
pub use file_csv::FileCsvReader;
pub use profile::{ConfigSource, ReaderParams, ReaderProfile, SharedProfiles};
pub use reader::{Reader, ReaderRef, Record};
