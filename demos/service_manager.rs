//! # Demo: service_manager
//!
//! Dependency-ordered startup, reload routing, and coordinated shutdown for
//! two services: a reader service that depends on a (toy) store service.
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► add_services(readers → store)   (cycle check at registration)
//!   ├─► start_services()                (store first, then readers)
//!   ├─► ReloadHandle::request("readers")
//!   └─► SIGINT/SIGTERM or 5s timer ─► shutdown_with_grace (stop ─► join)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example service_manager --features logging
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ingestvisor::{
    wait_for_shutdown_signal, Bus, Config, ConfigSource, LogWriter, ReaderParams, ReaderProfile,
    ReaderService, Service, ServiceError, ServiceManager, ServiceRef, SharedProfiles,
    ShutdownCoordinator, Subscribe, SubscriberSet, FORMAT_FILE_CSV,
};

/// Toy storage backend the reader service depends on.
struct StoreService {
    running: AtomicBool,
}

#[async_trait]
impl Service for StoreService {
    fn name(&self) -> &str {
        "store"
    }

    fn should_run(&self) -> bool {
        true
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn start(&self) -> Result<(), ServiceError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ServiceError::AlreadyRunning);
        }
        println!("[store] up");
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(ServiceError::NotRunning);
        }
        println!("[store] down");
        Ok(())
    }

    async fn reload(&self) -> Result<(), ServiceError> {
        println!("[store] reloaded in place");
        Ok(())
    }
}

/// ReaderService with a declared dependency on the store.
struct DependentReaders {
    inner: Arc<ReaderService>,
}

#[async_trait]
impl Service for DependentReaders {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["store".to_string()]
    }

    fn should_run(&self) -> bool {
        self.inner.should_run()
    }

    fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    async fn start(&self) -> Result<(), ServiceError> {
        self.inner.start().await
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        self.inner.stop().await
    }

    async fn reload(&self) -> Result<(), ServiceError> {
        self.inner.reload().await
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut f = std::fs::File::create(dir.path().join("in.csv"))?;
    writeln!(f, "acct,100,ok")?;
    writeln!(f, "acct,200,ok")?;

    let cfg = Config::default();
    let bus = Bus::new(cfg.bus_capacity);
    let shutdown = ShutdownCoordinator::new();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    Arc::new(SubscriberSet::new(subs, bus.clone())).listen(shutdown.child_token());

    let profiles = SharedProfiles::new(vec![ReaderProfile {
        id: "cdr-in".to_string(),
        enabled: true,
        group: dir.path().display().to_string(),
        format: FORMAT_FILE_CSV.to_string(),
        params: ReaderParams {
            source: dir.path().join("in.csv").display().to_string(),
            separator: ',',
        },
    }]);

    let readers = ReaderService::builder(
        "readers",
        Arc::clone(&profiles) as Arc<dyn ConfigSource>,
        bus.clone(),
        shutdown.clone(),
    )
    .build();

    let manager = ServiceManager::new(&cfg, bus.clone(), shutdown.clone());
    let services: Vec<ServiceRef> = vec![
        Arc::new(DependentReaders { inner: readers }),
        Arc::new(StoreService {
            running: AtomicBool::new(false),
        }),
    ];
    manager.add_services(services).await?;
    manager.start_services().await?;
    manager.clone().spawn_reload_listener();

    // Route one reload through the manager's queue.
    manager.reload_handle().request("readers").await?;

    // Run until a termination signal, or 5s for an unattended demo run.
    tokio::select! {
        res = wait_for_shutdown_signal() => res?,
        _ = tokio::time::sleep(Duration::from_secs(5)) => {}
    }

    manager.shutdown_with_grace(cfg.grace).await?;

    println!("[demo] all services stopped, loops joined.");
    Ok(())
}
