//! # Reader configuration entries and the configuration source contract.
//!
//! A [`ReaderProfile`] is one entry of the external configuration: a stable
//! id, an enabled flag, the ingestion group (path) it belongs to, the format
//! discriminator selecting the reader variant, and opaque format-specific
//! [`ReaderParams`].
//!
//! [`ConfigSource`] is the pull-snapshot half of the reload contract: the
//! reconciler re-reads `profiles()` on every pass and never mutates the
//! source. The push half is the edge-triggered
//! [`ReloadSignal`](crate::ReloadSignal).

use std::sync::{Arc, RwLock};

/// Format-specific reader parameters.
///
/// Opaque to the reconciliation core; interpreted only by the concrete reader
/// variant the factory selects.
#[derive(Clone, Debug)]
pub struct ReaderParams {
    /// Source location (file path for file-based formats).
    pub source: String,
    /// Field separator for delimited formats.
    pub separator: char,
}

impl Default for ReaderParams {
    fn default() -> Self {
        Self {
            source: String::new(),
            separator: ',',
        }
    }
}

/// One reader configuration entry.
///
/// Produced and owned by the external configuration subsystem; the core only
/// reads snapshots of it. `id` is stable and unique across reloads.
#[derive(Clone, Debug)]
pub struct ReaderProfile {
    /// Stable configuration identifier, unique across the whole configuration.
    pub id: String,
    /// Disabled entries are treated as absent by reconciliation.
    pub enabled: bool,
    /// Ingestion group (e.g. input path) the reader is bucketed under.
    pub group: String,
    /// Format discriminator selecting the reader variant (e.g. `*file_csv`).
    pub format: String,
    /// Opaque format-specific parameters.
    pub params: ReaderParams,
}

/// Pull-snapshot access to the current reader configuration.
///
/// Implementations must return a self-consistent snapshot; the reconciler
/// never holds the registry lock while calling this.
pub trait ConfigSource: Send + Sync + 'static {
    /// Returns the current set of configured profiles.
    fn profiles(&self) -> Vec<ReaderProfile>;
}

/// In-memory [`ConfigSource`] for demos and tests.
///
/// Swap the whole profile set with [`set`](SharedProfiles::set), then trigger
/// a reload. Persisted-config backends live outside this crate.
///
/// # Example
/// ```
/// use ingestvisor::{ConfigSource, ReaderParams, ReaderProfile, SharedProfiles};
///
/// let cfg = SharedProfiles::new(vec![ReaderProfile {
///     id: "cdr1".into(),
///     enabled: true,
///     group: "/var/spool/in".into(),
///     format: "*file_csv".into(),
///     params: ReaderParams::default(),
/// }]);
///
/// assert_eq!(cfg.profiles().len(), 1);
/// cfg.set(Vec::new());
/// assert!(cfg.profiles().is_empty());
/// ```
#[derive(Default)]
pub struct SharedProfiles {
    profiles: RwLock<Vec<ReaderProfile>>,
}

impl SharedProfiles {
    /// Creates a source holding the given profiles.
    pub fn new(profiles: Vec<ReaderProfile>) -> Arc<Self> {
        Arc::new(Self {
            profiles: RwLock::new(profiles),
        })
    }

    /// Replaces the whole profile set.
    pub fn set(&self, profiles: Vec<ReaderProfile>) {
        let mut guard = self.profiles.write().unwrap_or_else(|e| e.into_inner());
        *guard = profiles;
    }
}

impl ConfigSource for SharedProfiles {
    fn profiles(&self) -> Vec<ReaderProfile> {
        self.profiles
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
