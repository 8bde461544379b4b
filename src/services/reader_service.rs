//! # ReaderService: the reader-hosting subsystem as a Service.
//!
//! Owns one [`ReaderRegistry`], one [`Reconciler`], and the reader-side
//! [`ReloadSignal`]. Starting the service runs an initial reconciliation
//! pass and spawns the reconcile loop; stopping cancels the loop and closes
//! every registered reader; reloading nudges the loop to re-derive desired
//! state from the configuration source.

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::{ReaderRegistry, Reconciler, ReloadSignal};
use crate::error::ServiceError;
use crate::events::Bus;
use crate::readers::{ConfigSource, FormatFactory, ReaderFactory, Record};
use crate::shutdown::ShutdownCoordinator;

use super::service::Service;

/// Builder for a [`ReaderService`].
///
/// The factory defaults to [`FormatFactory`]; a delivery channel for
/// ingested records is optional.
pub struct ReaderServiceBuilder {
    name: String,
    source: Arc<dyn ConfigSource>,
    factory: Arc<dyn ReaderFactory>,
    bus: Bus,
    shutdown: ShutdownCoordinator,
    sink: Option<mpsc::Sender<Record>>,
}

impl ReaderServiceBuilder {
    /// Starts a builder with the built-in [`FormatFactory`].
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn ConfigSource>,
        bus: Bus,
        shutdown: ShutdownCoordinator,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            factory: Arc::new(FormatFactory),
            bus,
            shutdown,
            sink: None,
        }
    }

    /// Replaces the reader factory (custom variants, tests).
    pub fn with_factory(mut self, factory: Arc<dyn ReaderFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Forwards every ingested record to the given channel.
    pub fn with_sink(mut self, sink: mpsc::Sender<Record>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the service. It is registered and started via the
    /// [`ServiceManager`](crate::ServiceManager) or started directly.
    pub fn build(self) -> Arc<ReaderService> {
        let registry = ReaderRegistry::new(self.bus.clone());
        let reload = ReloadSignal::new();
        let name: Arc<str> = Arc::from(self.name.as_str());

        let mut reconciler = Reconciler::new(
            Arc::clone(&name),
            Arc::clone(&self.source),
            self.factory,
            Arc::clone(&registry),
            self.bus.clone(),
            reload.clone(),
        );
        if let Some(sink) = self.sink {
            reconciler = reconciler.with_sink(sink);
        }

        Arc::new(ReaderService {
            name,
            source: self.source,
            registry,
            reconciler: Arc::new(reconciler),
            reload,
            shutdown: self.shutdown,
            running: AtomicBool::new(false),
            loop_token: Mutex::new(None),
        })
    }
}

/// Reader-hosting subsystem: keeps its registry reconciled with the
/// configuration source while running.
pub struct ReaderService {
    name: Arc<str>,
    source: Arc<dyn ConfigSource>,
    registry: Arc<ReaderRegistry>,
    reconciler: Arc<Reconciler>,
    reload: ReloadSignal,
    shutdown: ShutdownCoordinator,
    running: AtomicBool,
    loop_token: Mutex<Option<CancellationToken>>,
}

impl ReaderService {
    /// Starts a [`ReaderServiceBuilder`].
    pub fn builder(
        name: impl Into<String>,
        source: Arc<dyn ConfigSource>,
        bus: Bus,
        shutdown: ShutdownCoordinator,
    ) -> ReaderServiceBuilder {
        ReaderServiceBuilder::new(name, source, bus, shutdown)
    }

    /// The registry of live readers (narrow inspection/mutation surface).
    pub fn registry(&self) -> Arc<ReaderRegistry> {
        Arc::clone(&self.registry)
    }

    /// The reload signal; wire this to the configuration source's change
    /// notifications.
    pub fn reload_signal(&self) -> ReloadSignal {
        self.reload.clone()
    }

    fn take_loop_token(&self) -> Option<CancellationToken> {
        self.loop_token
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    fn store_loop_token(&self, token: CancellationToken) {
        *self.loop_token.lock().unwrap_or_else(|e| e.into_inner()) = Some(token);
    }
}

#[async_trait]
impl Service for ReaderService {
    fn name(&self) -> &str {
        &self.name
    }

    fn should_run(&self) -> bool {
        self.source.profiles().iter().any(|p| p.enabled)
    }

    fn is_running(&self) -> bool {
        self.running.load(AtomicOrdering::SeqCst)
    }

    async fn start(&self) -> Result<(), ServiceError> {
        if self.running.swap(true, AtomicOrdering::SeqCst) {
            return Err(ServiceError::AlreadyRunning);
        }

        let token = self.shutdown.child_token();
        self.store_loop_token(token.clone());

        self.reconciler.reconcile_once(&token).await;
        let reconciler = Arc::clone(&self.reconciler);
        self.shutdown.spawn(reconciler.run(token));
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        if !self.running.swap(false, AtomicOrdering::SeqCst) {
            return Err(ServiceError::NotRunning);
        }

        if let Some(token) = self.take_loop_token() {
            token.cancel();
        }
        self.registry.close_all().await;
        Ok(())
    }

    async fn reload(&self) -> Result<(), ServiceError> {
        self.reload.trigger();
        Ok(())
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
        service: Arc<ReaderService>,
        shutdown: ShutdownCoordinator,
    }

    fn fixture(profiles: Vec<crate::ReaderProfile>) -> Fixture {
        let bus = Bus::new(256);
        let shutdown = ShutdownCoordinator::new();
        let book = CounterBook::default();
        let profiles = SharedProfiles::new(profiles);
        let service = ReaderService::builder(
            "readers",
            Arc::clone(&profiles) as Arc<dyn ConfigSource>,
            bus,
            shutdown.clone(),
        )
        .with_factory(Arc::new(MockFactory::new(&book)))
        .build();
        Fixture {
            profiles,
            book,
            service,
            shutdown,
        }
    }

    #[tokio::test]
    async fn test_start_runs_initial_pass() {
        let fx = fixture(vec![mock_profile("a", "/in"), mock_profile("b", "/in")]);

        fx.service.start().await.unwrap();
        assert!(fx.service.is_running());
        assert_eq!(
            fx.service.registry().list().await,
            vec!["a".to_string(), "b".to_string()]
        );

        fx.service.stop().await.unwrap();
        assert_eq!(fx.book.closes("a"), 1);
        assert_eq!(fx.book.closes("b"), 1);
    }

    #[tokio::test]
    async fn test_double_start_is_rejected_and_state_unchanged() {
        let fx = fixture(vec![mock_profile("a", "/in")]);

        fx.service.start().await.unwrap();
        let err = fx.service.start().await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyRunning));
        assert!(fx.service.is_running());

        fx.service.stop().await.unwrap();
        let err = fx.service.stop().await.unwrap_err();
        assert!(matches!(err, ServiceError::NotRunning));
    }

    #[tokio::test]
    async fn test_reload_applies_new_configuration() {
        let fx = fixture(vec![mock_profile("a", "/in")]);
        fx.service.start().await.unwrap();

        fx.profiles
            .set(vec![mock_profile("a", "/in"), mock_profile("c", "/other")]);
        fx.service.reload().await.unwrap();

        let registry = fx.service.registry();
        tokio::time::timeout(Duration::from_secs(2), async {
            while registry.len().await != 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(
            registry.list().await,
            vec!["a".to_string(), "c".to_string()]
        );
        // "a" was present in both configurations: untouched
        assert_eq!(fx.book.inits("a"), 1);
        fx.service.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_should_run_follows_enabled_profiles() {
        let fx = fixture(vec![mock_profile("a", "/in")]);
        assert!(fx.service.should_run());

        let mut disabled = mock_profile("a", "/in");
        disabled.enabled = false;
        fx.profiles.set(vec![disabled]);
        assert!(!fx.service.should_run());
    }

    #[tokio::test]
    async fn test_service_can_be_started_again_after_stop() {
        let fx = fixture(vec![mock_profile("a", "/in")]);

        fx.service.start().await.unwrap();
        fx.service.stop().await.unwrap();
        fx.service.start().await.unwrap();

        assert!(fx.service.is_running());
        assert_eq!(fx.service.registry().list().await, vec!["a".to_string()]);
        assert_eq!(fx.book.inits("a"), 2);

        fx.service.stop().await.unwrap();
        fx.shutdown.trigger();
        fx.shutdown
            .join_with_grace(Duration::from_secs(2))
            .await
            .unwrap();
    }
}
