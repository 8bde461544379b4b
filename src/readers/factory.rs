//! # Reader construction: format discriminator → concrete variant.
//!
//! [`ReaderFactory`] turns one [`ReaderProfile`] into the matching [`Reader`]
//! variant. [`FormatFactory`] is the built-in implementation and the single
//! place new variants are added; an unrecognized format is a construction-time
//! error, never a panic.

use std::sync::Arc;

use crate::error::ReaderError;

use super::file_csv::FileCsvReader;
use super::profile::ReaderProfile;
use super::reader::ReaderRef;

/// Format discriminator for the line-oriented delimited file variant.
pub const FORMAT_FILE_CSV: &str = "*file_csv";

/// Constructs the reader variant selected by a profile's format discriminator.
///
/// Construction must not touch external resources; resource acquisition
/// happens in [`Reader::init`](crate::Reader::init) so that a failed entry
/// leaves no partial registration.
pub trait ReaderFactory: Send + Sync + 'static {
    /// Builds the reader for the given profile.
    ///
    /// Returns [`ReaderError::Unsupported`] for unknown discriminators.
    fn build(&self, profile: &ReaderProfile) -> Result<ReaderRef, ReaderError>;
}

/// Built-in factory mapping format discriminators to reader variants.
///
/// # Example
/// ```
/// use ingestvisor::{FormatFactory, ReaderFactory, ReaderParams, ReaderProfile};
///
/// let factory = FormatFactory;
/// let profile = ReaderProfile {
///     id: "cdr1".into(),
///     enabled: true,
///     group: "/var/spool/in".into(),
///     format: "*http_json".into(),
///     params: ReaderParams::default(),
/// };
///
/// let err = factory.build(&profile).err().unwrap();
/// assert_eq!(err.to_string(), "unsupported format: <*http_json>");
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct FormatFactory;

impl ReaderFactory for FormatFactory {
    fn build(&self, profile: &ReaderProfile) -> Result<ReaderRef, ReaderError> {
        match profile.format.as_str() {
            FORMAT_FILE_CSV => Ok(Arc::new(FileCsvReader::new(profile))),
            other => Err(ReaderError::Unsupported {
                format: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::profile::ReaderParams;

    fn profile(format: &str) -> ReaderProfile {
        ReaderProfile {
            id: "r1".into(),
            enabled: true,
            group: "/in".into(),
            format: format.into(),
            params: ReaderParams::default(),
        }
    }

    #[test]
    fn test_builds_file_csv() {
        let rdr = FormatFactory.build(&profile(FORMAT_FILE_CSV)).unwrap();
        assert_eq!(rdr.id(), "r1");
        assert_eq!(rdr.processed(), 0);
    }

    #[test]
    fn test_unknown_format_is_an_error_not_a_panic() {
        let err = FormatFactory.build(&profile("*kam_flatstore")).err().unwrap();
        assert!(matches!(err, ReaderError::Unsupported { ref format } if format == "*kam_flatstore"));
        assert_eq!(err.to_string(), "unsupported format: <*kam_flatstore>");
    }
}
