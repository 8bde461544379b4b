//! # Reconciler: keeps live readers synchronized with configuration.
//!
//! One pass diffs the enabled [`ReaderProfile`]s against the registry and
//! applies the difference: removals first, then additions.
//!
//! ## Architecture
//! ```text
//! ReloadSignal ──► Reconciler::run()
//!                    └─► reconcile_once()
//!                          ├─ profiles() → enabled, indexed by id
//!                          ├─ registry.snapshot() → live, indexed by id
//!                          ├─ to_remove = live − configured   → close + deregister
//!                          ├─ to_add    = configured − live   → build + init + register
//!                          └─ ids in both sets: untouched
//! ```
//!
//! ## Rules
//! - Passes are strictly serialized: one loop, one pass at a time. Triggers
//!   arriving mid-pass coalesce into at most one further pass
//!   (single-permit [`ReloadSignal`]).
//! - All removals complete (close returned) before any addition begins, so
//!   two readers never claim the same group-scoped resource concurrently.
//! - Readers present in both sets are never restarted (idempotence).
//! - One bad entry (unsupported format, failed init) is skipped with a
//!   `ReaderSkipped` event; the pass continues.
//! - A duplicate id on insert aborts the pass loudly: that is a bug in this
//!   algorithm, not a configuration problem.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

use crate::core::actor::ReaderActor;
use crate::core::registry::ReaderRegistry;
use crate::events::{Bus, Event, EventKind};
use crate::readers::{ConfigSource, ReaderFactory, ReaderProfile, Record};

/// Edge-triggered reload token with single-permit coalescing.
///
/// `trigger()` stores at most one pending wake-up: a burst of triggers while
/// a pass is in flight yields exactly one further pass, not a queue of them.
///
/// # Example
/// ```
/// use ingestvisor::ReloadSignal;
///
/// let signal = ReloadSignal::new();
/// signal.trigger();
/// signal.trigger(); // coalesced with the first
/// ```
#[derive(Clone, Debug, Default)]
pub struct ReloadSignal {
    notify: Arc<Notify>,
}

impl ReloadSignal {
    /// Creates a signal with no pending trigger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a reconciliation pass; never blocks.
    pub fn trigger(&self) {
        self.notify.notify_one();
    }

    /// Completes once a trigger is pending, consuming it.
    pub(crate) async fn triggered(&self) {
        self.notify.notified().await;
    }
}

/// Diffs desired configuration against live readers and applies the result.
pub struct Reconciler {
    service: Arc<str>,
    source: Arc<dyn ConfigSource>,
    factory: Arc<dyn ReaderFactory>,
    registry: Arc<ReaderRegistry>,
    bus: Bus,
    reload: ReloadSignal,
    sink: Option<mpsc::Sender<Record>>,
}

impl Reconciler {
    /// Creates a reconciler over the given configuration source and registry.
    pub fn new(
        service: impl Into<Arc<str>>,
        source: Arc<dyn ConfigSource>,
        factory: Arc<dyn ReaderFactory>,
        registry: Arc<ReaderRegistry>,
        bus: Bus,
        reload: ReloadSignal,
    ) -> Self {
        Self {
            service: service.into(),
            source,
            factory,
            registry,
            bus,
            reload,
            sink: None,
        }
    }

    /// Forwards every ingested record to the given delivery channel.
    pub fn with_sink(mut self, sink: mpsc::Sender<Record>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Blocks on the reload signal and runs one pass per coalesced trigger
    /// until the token fires.
    pub async fn run(self: Arc<Self>, token: CancellationToken) {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = self.reload.triggered() => {
                    self.reconcile_once(&token).await;
                }
            }
        }
    }

    /// Runs exactly one diff-and-apply pass. Returns `(added, removed)`.
    ///
    /// `runtime` is the parent token for the driving actors of any readers
    /// added by this pass.
    pub async fn reconcile_once(&self, runtime: &CancellationToken) -> (u32, u32) {
        let desired: HashMap<String, ReaderProfile> = self
            .source
            .profiles()
            .into_iter()
            .filter(|p| p.enabled)
            .map(|p| (p.id.clone(), p))
            .collect();
        let live = self.registry.snapshot().await;

        let mut to_remove: Vec<&String> =
            live.keys().filter(|id| !desired.contains_key(*id)).collect();
        to_remove.sort_unstable();

        let mut to_add: Vec<&ReaderProfile> = desired
            .values()
            .filter(|p| !live.contains_key(&p.id))
            .collect();
        to_add.sort_unstable_by(|a, b| a.id.cmp(&b.id));

        let mut removed: u32 = 0;
        for id in to_remove {
            if self.registry.remove_by_id(id).await {
                removed += 1;
            }
        }

        let mut added: u32 = 0;
        for profile in to_add {
            match self.apply_addition(profile, runtime).await {
                Ok(true) => added += 1,
                Ok(false) => {}
                Err(()) => {
                    // Invariant violation: the registry is still consistent,
                    // but this pass cannot be trusted any further.
                    return (added, removed);
                }
            }
        }

        self.bus.publish(
            Event::new(EventKind::ReconcileCompleted)
                .with_name(Arc::clone(&self.service))
                .with_counts(added, removed),
        );
        (added, removed)
    }

    /// Builds, initializes, and registers one configured reader.
    ///
    /// `Ok(true)` means registered, `Ok(false)` means the entry was skipped;
    /// `Err(())` means the pass must abort (duplicate id).
    async fn apply_addition(
        &self,
        profile: &ReaderProfile,
        runtime: &CancellationToken,
    ) -> Result<bool, ()> {
        let reader = match self.factory.build(profile) {
            Ok(r) => r,
            Err(e) => {
                self.skip(profile, e.to_string());
                return Ok(false);
            }
        };

        if let Err(e) = reader.init().await {
            let _ = reader.close().await;
            self.skip(profile, e.to_string());
            return Ok(false);
        }

        let cancel = runtime.child_token();
        let actor = ReaderActor::new(Arc::clone(&reader), self.bus.clone(), self.sink.clone());
        let join = tokio::spawn(actor.run(cancel.clone()));

        if let Err(e) = self
            .registry
            .insert(&profile.group, Arc::clone(&reader), join, cancel.clone())
            .await
        {
            cancel.cancel();
            let _ = reader.close().await;
            self.bus.publish(
                Event::new(EventKind::ReconcileAborted)
                    .with_name(profile.id.as_str())
                    .with_reason(e.to_string()),
            );
            return Err(());
        }

        self.bus.publish(
            Event::new(EventKind::ReaderAdded)
                .with_name(profile.id.as_str())
                .with_group(profile.group.as_str()),
        );
        Ok(true)
    }

    fn skip(&self, profile: &ReaderProfile, reason: String) {
        self.bus.publish(
            Event::new(EventKind::ReaderSkipped)
                .with_name(profile.id.as_str())
                .with_group(profile.group.as_str())
                .with_reason(reason),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mock_profile, CounterBook, MockFactory};
    use crate::SharedProfiles;
    use std::time::Duration;

    struct Fixture {
        profiles: Arc<SharedProfiles>,
        book: CounterBook,
        registry: Arc<ReaderRegistry>,
        reconciler: Reconciler,
        bus: Bus,
    }

    fn fixture(profiles: Vec<crate::ReaderProfile>) -> Fixture {
        let bus = Bus::new(256);
        let book = CounterBook::default();
        let profiles = SharedProfiles::new(profiles);
        let registry = ReaderRegistry::new(bus.clone());
        let reconciler = Reconciler::new(
            "readers",
            Arc::clone(&profiles) as Arc<dyn ConfigSource>,
            Arc::new(MockFactory::new(&book)),
            Arc::clone(&registry),
            bus.clone(),
            ReloadSignal::new(),
        );
        Fixture {
            profiles,
            book,
            registry,
            reconciler,
            bus,
        }
    }

    #[tokio::test]
    async fn test_add_only_pass() {
        let fx = fixture(vec![mock_profile("a", "/in"), mock_profile("b", "/in")]);
        let token = CancellationToken::new();

        let (added, removed) = fx.reconciler.reconcile_once(&token).await;
        assert_eq!((added, removed), (2, 0));
        assert_eq!(
            fx.registry.list().await,
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(fx.book.inits("a"), 1);
        assert_eq!(fx.book.inits("b"), 1);
        token.cancel();
    }

    #[tokio::test]
    async fn test_second_pass_is_a_no_op() {
        let fx = fixture(vec![mock_profile("a", "/in"), mock_profile("b", "/in")]);
        let token = CancellationToken::new();

        fx.reconciler.reconcile_once(&token).await;
        let (added, removed) = fx.reconciler.reconcile_once(&token).await;

        assert_eq!((added, removed), (0, 0));
        assert_eq!(fx.book.inits("a"), 1);
        assert_eq!(fx.book.inits("b"), 1);
        assert_eq!(fx.book.closes("a"), 0);
        assert_eq!(fx.book.closes("b"), 0);
        token.cancel();
    }

    #[tokio::test]
    async fn test_disabling_removes_without_touching_others() {
        let fx = fixture(vec![mock_profile("a", "/in"), mock_profile("b", "/in")]);
        let token = CancellationToken::new();
        fx.reconciler.reconcile_once(&token).await;

        let mut disabled = mock_profile("b", "/in");
        disabled.enabled = false;
        fx.profiles.set(vec![mock_profile("a", "/in"), disabled]);

        let (added, removed) = fx.reconciler.reconcile_once(&token).await;
        assert_eq!((added, removed), (0, 1));
        assert_eq!(fx.registry.list().await, vec!["a".to_string()]);
        assert_eq!(fx.book.closes("b"), 1);
        // untouched: no re-init, no close
        assert_eq!(fx.book.inits("a"), 1);
        assert_eq!(fx.book.closes("a"), 0);
        token.cancel();
    }

    #[tokio::test]
    async fn test_bad_entry_is_skipped_and_pass_continues() {
        let mut unsupported = mock_profile("x", "/in");
        unsupported.format = "*http_json".to_string();
        let fx = fixture(vec![mock_profile("a", "/in"), unsupported]);
        let mut events = fx.bus.subscribe();
        let token = CancellationToken::new();

        let (added, removed) = fx.reconciler.reconcile_once(&token).await;
        assert_eq!((added, removed), (1, 0));
        assert_eq!(fx.registry.list().await, vec!["a".to_string()]);

        let mut saw_skip = false;
        while let Ok(Ok(ev)) =
            tokio::time::timeout(Duration::from_millis(200), events.recv()).await
        {
            if ev.kind == EventKind::ReaderSkipped {
                assert_eq!(ev.name.as_deref(), Some("x"));
                assert_eq!(
                    ev.reason.as_deref(),
                    Some("unsupported format: <*http_json>")
                );
                saw_skip = true;
            }
        }
        assert!(saw_skip);
        token.cancel();
    }

    #[tokio::test]
    async fn test_failed_init_is_skipped_and_closed() {
        let mut broken = mock_profile("bad", "/in");
        broken.params.source = "fail-init".to_string();
        let fx = fixture(vec![mock_profile("a", "/in"), broken]);
        let token = CancellationToken::new();

        let (added, _) = fx.reconciler.reconcile_once(&token).await;
        assert_eq!(added, 1);
        assert_eq!(fx.registry.list().await, vec!["a".to_string()]);
        // close must be safe and called after the failed init
        assert_eq!(fx.book.closes("bad"), 1);
        token.cancel();
    }

    #[tokio::test]
    async fn test_concurrent_reads_during_removal() {
        let fx = fixture(vec![mock_profile("a", "/in"), mock_profile("b", "/other")]);
        let token = CancellationToken::new();
        fx.reconciler.reconcile_once(&token).await;

        let readers = fx.registry.readers().await;
        let hammer = tokio::spawn(async move {
            for _ in 0..1_000 {
                for r in &readers {
                    let _ = r.id();
                    assert!(r.processed() >= 0);
                }
                tokio::task::yield_now().await;
            }
        });

        fx.profiles.set(vec![mock_profile("a", "/in")]);
        fx.reconciler.reconcile_once(&token).await;

        hammer.await.unwrap();
        assert_eq!(fx.registry.list().await, vec!["a".to_string()]);
        token.cancel();
    }

    #[tokio::test]
    async fn test_run_loop_applies_coalesced_triggers() {
        let fx = fixture(vec![mock_profile("a", "/in")]);
        let token = CancellationToken::new();
        let signal = fx.reconciler.reload.clone();
        let registry = Arc::clone(&fx.registry);

        let reconciler = Arc::new(fx.reconciler);
        let handle = tokio::spawn(Arc::clone(&reconciler).run(token.clone()));

        // A burst of triggers must still converge to the configured set.
        for _ in 0..5 {
            signal.trigger();
        }
        tokio::time::timeout(Duration::from_secs(2), async {
            while registry.is_empty().await {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(registry.list().await, vec!["a".to_string()]);
        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_reload_signal_coalesces() {
        let signal = ReloadSignal::new();
        signal.trigger();
        signal.trigger();

        // First wait consumes the single stored permit...
        tokio::time::timeout(Duration::from_millis(100), signal.triggered())
            .await
            .unwrap();
        // ...and the burst left nothing else behind.
        assert!(
            tokio::time::timeout(Duration::from_millis(100), signal.triggered())
                .await
                .is_err()
        );
    }
}
