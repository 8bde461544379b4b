//! # Line-oriented delimited file reader (`*file_csv`).
//!
//! One record per line, fields split on the profile's separator. This is the
//! transport skeleton of the format: quoting/escaping dialects are the
//! concern of downstream processing, not of ingestion.

use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::sync::Mutex;

use crate::error::ReaderError;

use super::profile::ReaderProfile;
use super::reader::{Reader, Record};

enum Source {
    /// Constructed but not yet initialized.
    Idle,
    /// Open and producing lines.
    Open(Lines<BufReader<File>>),
    /// Closed; all further steps fail with [`ReaderError::Closed`].
    Closed,
}

/// Reader over a line-delimited file, one [`Record`] per line.
pub struct FileCsvReader {
    id: Arc<str>,
    path: PathBuf,
    separator: char,
    processed: AtomicI64,
    source: Mutex<Source>,
}

impl FileCsvReader {
    /// Captures the profile's parameters; no I/O happens until `init`.
    pub fn new(profile: &ReaderProfile) -> Self {
        Self {
            id: Arc::from(profile.id.as_str()),
            path: PathBuf::from(&profile.params.source),
            separator: profile.params.separator,
            processed: AtomicI64::new(0),
            source: Mutex::new(Source::Idle),
        }
    }
}

#[async_trait]
impl Reader for FileCsvReader {
    fn id(&self) -> &str {
        &self.id
    }

    async fn init(&self) -> Result<(), ReaderError> {
        let file = File::open(&self.path).await.map_err(|e| ReaderError::Init {
            reason: format!("open {}: {e}", self.path.display()),
        })?;
        let mut source = self.source.lock().await;
        *source = Source::Open(BufReader::new(file).lines());
        Ok(())
    }

    async fn step(&self) -> Result<Record, ReaderError> {
        let mut source = self.source.lock().await;
        let lines = match &mut *source {
            Source::Idle => {
                return Err(ReaderError::Read {
                    reason: "reader not initialized".to_string(),
                })
            }
            Source::Closed => return Err(ReaderError::Closed),
            Source::Open(lines) => lines,
        };

        match lines.next_line().await {
            Ok(Some(line)) => {
                let fields = line
                    .split(self.separator)
                    .map(|f| f.trim().to_string())
                    .collect();
                self.processed.fetch_add(1, AtomicOrdering::Relaxed);
                Ok(Record {
                    source: Arc::clone(&self.id),
                    fields,
                })
            }
            Ok(None) => Err(ReaderError::Exhausted),
            Err(e) => Err(ReaderError::Read {
                reason: e.to_string(),
            }),
        }
    }

    fn processed(&self) -> i64 {
        self.processed.load(AtomicOrdering::Relaxed)
    }

    async fn close(&self) -> Result<(), ReaderError> {
        let mut source = self.source.lock().await;
        *source = Source::Closed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::profile::ReaderParams;
    use std::io::Write;

    fn profile_for(path: &std::path::Path) -> ReaderProfile {
        ReaderProfile {
            id: "csv1".into(),
            enabled: true,
            group: "/in".into(),
            format: "*file_csv".into(),
            params: ReaderParams {
                source: path.display().to_string(),
                separator: ',',
            },
        }
    }

    #[tokio::test]
    async fn test_reads_until_exhausted_and_counts() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "a,b,c").unwrap();
        writeln!(tmp, "1, 2 ,3").unwrap();
        tmp.flush().unwrap();

        let rdr = FileCsvReader::new(&profile_for(tmp.path()));
        rdr.init().await.unwrap();

        let first = rdr.step().await.unwrap();
        assert_eq!(first.source.as_ref(), "csv1");
        assert_eq!(first.fields, vec!["a", "b", "c"]);

        let second = rdr.step().await.unwrap();
        assert_eq!(second.fields, vec!["1", "2", "3"]);

        let end = rdr.step().await.unwrap_err();
        assert!(end.is_exhausted());
        assert_eq!(rdr.processed(), 2);
    }

    #[tokio::test]
    async fn test_init_error_on_missing_file() {
        let rdr = FileCsvReader::new(&profile_for(std::path::Path::new(
            "/nonexistent/ingestvisor-test",
        )));
        let err = rdr.init().await.unwrap_err();
        assert!(matches!(err, ReaderError::Init { .. }));
        // close must be safe even though init failed
        rdr.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_step_after_close_returns_closed() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "x").unwrap();
        tmp.flush().unwrap();

        let rdr = FileCsvReader::new(&profile_for(tmp.path()));
        rdr.init().await.unwrap();
        rdr.close().await.unwrap();
        rdr.close().await.unwrap(); // idempotent

        let err = rdr.step().await.unwrap_err();
        assert!(matches!(err, ReaderError::Closed));
    }

    #[tokio::test]
    async fn test_step_before_init_is_an_error() {
        let rdr = FileCsvReader::new(&profile_for(std::path::Path::new("/dev/null")));
        let err = rdr.step().await.unwrap_err();
        assert!(matches!(err, ReaderError::Read { .. }));
    }
}
