//! # ServiceManager: registration, ordered start, reload routing, shutdown.
//!
//! ## Architecture
//! ```text
//! add_services(...)         - registers; rejects dependency cycles outright
//! start_services()          - topological order; dependents wait for Running
//! ReloadHandle::request(n) ─► reload queue ─► listener ─► reload(n)
//!                                                   ├─ enabled, stopped → start
//!                                                   ├─ disabled, running → stop
//!                                                   ├─ enabled, running → Service::reload
//!                                                   └─ disabled, stopped → no-op
//! stop_services()           - reverse order, shutdown path
//! ```
//!
//! ## Rules
//! - Cycles are a fatal configuration error at **registration** time; the
//!   offending batch is not registered at all.
//! - Each registered service owns a running signal
//!   (`tokio::sync::watch<bool>`); a dependent's start waits on each
//!   dependency's signal reaching `true`.
//! - One failing service never aborts the others: `start_services` attempts
//!   every service and returns the first failure after the sweep.
//! - Lifecycle misuse (`start` while running) propagates to the caller
//!   synchronously; it is never converted into a crash or silently dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch, RwLock};

use crate::config::Config;
use crate::error::{RuntimeError, ServiceError};
use crate::events::{Bus, Event, EventKind};
use crate::shutdown::ShutdownCoordinator;

use super::service::ServiceRef;

/// Handle for requesting service reloads from configuration code.
///
/// Cheap to clone; requests are routed by service name through a bounded
/// queue to the manager's listener loop.
#[derive(Clone)]
pub struct ReloadHandle {
    tx: mpsc::Sender<String>,
}

impl ReloadHandle {
    /// Requests a reload (async, waits while the queue is full).
    pub async fn request(&self, service: impl Into<String>) -> Result<(), ServiceError> {
        self.tx
            .send(service.into())
            .await
            .map_err(|_| ServiceError::ReloadQueueClosed)
    }

    /// Requests a reload without blocking (fails if the queue is full).
    pub fn try_request(&self, service: impl Into<String>) -> Result<(), ServiceError> {
        self.tx.try_send(service.into()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ServiceError::ReloadQueueFull,
            mpsc::error::TrySendError::Closed(_) => ServiceError::ReloadQueueClosed,
        })
    }
}

/// One registered service plus its running signal for dependents.
struct ServiceEntry {
    service: ServiceRef,
    running: Arc<watch::Sender<bool>>,
}

/// Tracks a set of named services and applies the start/stop/reload
/// discipline to whole subsystems.
pub struct ServiceManager {
    services: RwLock<HashMap<String, ServiceEntry>>,
    bus: Bus,
    shutdown: ShutdownCoordinator,
    reload_tx: mpsc::Sender<String>,
    reload_rx: Mutex<Option<mpsc::Receiver<String>>>,
}

impl ServiceManager {
    /// Creates a manager with no registered services.
    pub fn new(cfg: &Config, bus: Bus, shutdown: ShutdownCoordinator) -> Arc<Self> {
        let (reload_tx, reload_rx) = mpsc::channel(cfg.reload_queue_clamped());
        Arc::new(Self {
            services: RwLock::new(HashMap::new()),
            bus,
            shutdown,
            reload_tx,
            reload_rx: Mutex::new(Some(reload_rx)),
        })
    }

    /// Returns a handle for requesting reloads by service name.
    pub fn reload_handle(&self) -> ReloadHandle {
        ReloadHandle {
            tx: self.reload_tx.clone(),
        }
    }

    /// Registers services, validating the dependency graph.
    ///
    /// A cycle among registered-plus-new services is a fatal configuration
    /// error: nothing from the batch is registered. Already-registered names
    /// are left untouched.
    pub async fn add_services(&self, batch: Vec<ServiceRef>) -> Result<(), ServiceError> {
        let mut services = self.services.write().await;

        let mut graph: HashMap<String, Vec<String>> = services
            .iter()
            .map(|(name, entry)| (name.clone(), entry.service.dependencies()))
            .collect();
        for service in &batch {
            graph
                .entry(service.name().to_string())
                .or_insert_with(|| service.dependencies());
        }
        detect_cycle(&graph)?;

        for service in batch {
            let name = service.name().to_string();
            if services.contains_key(&name) {
                continue;
            }
            let (running, _) = watch::channel(false);
            services.insert(
                name,
                ServiceEntry {
                    service,
                    running: Arc::new(running),
                },
            );
        }
        Ok(())
    }

    /// Starts every enabled service in dependency order.
    ///
    /// A service is started only after each of its dependencies reports
    /// Running; a dependent whose dependency is not running is skipped with a
    /// `ServiceSkipped` event. Failures are published and the first one is
    /// returned after all services have been attempted.
    pub async fn start_services(&self) -> Result<(), ServiceError> {
        let order = self.topological_order().await?;
        let mut first_err: Option<ServiceError> = None;

        for name in order {
            let Some((service, running)) = self.entry(&name).await else {
                continue;
            };

            if !service.should_run() {
                continue;
            }
            if service.is_running() {
                running.send_replace(true);
                continue;
            }

            if let Some(dep) = self.missing_dependency(&service).await {
                self.bus.publish(
                    Event::new(EventKind::ServiceSkipped)
                        .with_name(name.as_str())
                        .with_reason(dep),
                );
                continue;
            }

            match service.start().await {
                Ok(()) => {
                    running.send_replace(true);
                    self.bus
                        .publish(Event::new(EventKind::ServiceStarted).with_name(name.as_str()));
                }
                Err(e) => {
                    self.bus.publish(
                        Event::new(EventKind::ServiceFailed)
                            .with_name(name.as_str())
                            .with_reason(e.to_string()),
                    );
                    first_err.get_or_insert(ServiceError::Failed {
                        service: name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Applies a configuration change to one service.
    ///
    /// Reload subsumes on/off: an enabled stopped service is started (after
    /// its dependencies signal Running), a disabled running service is
    /// stopped, and an enabled running service reloads in place.
    pub async fn reload(&self, name: &str) -> Result<(), ServiceError> {
        let (service, running) =
            self.entry(name)
                .await
                .ok_or_else(|| ServiceError::UnknownService {
                    name: name.to_string(),
                })?;

        match (service.should_run(), service.is_running()) {
            (true, false) => {
                self.await_dependencies(&service).await?;
                if let Err(e) = service.start().await {
                    self.publish_failed(name, &e);
                    return Err(e);
                }
                running.send_replace(true);
                self.bus
                    .publish(Event::new(EventKind::ServiceStarted).with_name(name));
            }
            (false, true) => {
                if let Err(e) = service.stop().await {
                    self.publish_failed(name, &e);
                    return Err(e);
                }
                running.send_replace(false);
                self.bus
                    .publish(Event::new(EventKind::ServiceStopped).with_name(name));
            }
            (true, true) => {
                if let Err(e) = service.reload().await {
                    self.publish_failed(name, &e);
                    return Err(e);
                }
                self.bus
                    .publish(Event::new(EventKind::ServiceReloaded).with_name(name));
            }
            (false, false) => {}
        }
        Ok(())
    }

    /// Stops every running service in reverse dependency order.
    ///
    /// Failures are published; the first one is returned after the sweep.
    pub async fn stop_services(&self) -> Result<(), ServiceError> {
        let mut order = self.topological_order().await?;
        order.reverse();
        let mut first_err: Option<ServiceError> = None;

        for name in order {
            let Some((service, running)) = self.entry(&name).await else {
                continue;
            };
            if !service.is_running() {
                running.send_replace(false);
                continue;
            }
            match service.stop().await {
                Ok(()) => {
                    running.send_replace(false);
                    self.bus
                        .publish(Event::new(EventKind::ServiceStopped).with_name(name.as_str()));
                }
                Err(e) => {
                    self.publish_failed(&name, &e);
                    first_err.get_or_insert(ServiceError::Failed {
                        service: name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Full shutdown path: stop services, fire the signal, join with grace.
    ///
    /// Publishes `ShutdownRequested` up front and `AllStoppedWithin` on a
    /// clean join, or `GraceExceeded` when loops had to be abandoned (the
    /// error carries the grace that was exceeded). Per-service stop failures
    /// are published by [`stop_services`](Self::stop_services) and do not
    /// block the join.
    pub async fn shutdown_with_grace(&self, grace: Duration) -> Result<(), RuntimeError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        let _ = self.stop_services().await;
        self.shutdown.trigger();

        match self.shutdown.join_with_grace(grace).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(e) => {
                self.bus.publish(Event::new(EventKind::GraceExceeded));
                Err(e)
            }
        }
    }

    /// Spawns the reload listener loop (tracked by the coordinator).
    ///
    /// Call once after registration; each queued name is forwarded to
    /// [`reload`](Self::reload) until shutdown fires.
    pub fn spawn_reload_listener(self: Arc<Self>) {
        let me = Arc::clone(&self);
        self.shutdown.spawn(async move {
            if let Err(e) = me.reload_loop().await {
                me.bus.publish(
                    Event::new(EventKind::ServiceFailed)
                        .with_name("service-manager")
                        .with_reason(e.to_string()),
                );
            }
        });
    }

    async fn reload_loop(&self) -> anyhow::Result<()> {
        let mut rx = self
            .reload_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or_else(|| anyhow::anyhow!("reload listener already running"))?;

        loop {
            tokio::select! {
                _ = self.shutdown.triggered() => break,
                msg = rx.recv() => match msg {
                    Some(name) => {
                        self.bus.publish(
                            Event::new(EventKind::ReloadRequested).with_name(name.as_str()),
                        );
                        // Per-service failures were already published; they
                        // must not stop the listener.
                        let _ = self.reload(&name).await;
                    }
                    None => break,
                }
            }
        }
        Ok(())
    }

    /// Waits until every dependency of `service` signals Running.
    async fn await_dependencies(&self, service: &ServiceRef) -> Result<(), ServiceError> {
        for dep in service.dependencies() {
            let mut rx = {
                let services = self.services.read().await;
                services
                    .get(&dep)
                    .map(|entry| entry.running.subscribe())
                    .ok_or_else(|| ServiceError::UnknownDependency {
                        service: service.name().to_string(),
                        dependency: dep.clone(),
                    })?
            };

            tokio::select! {
                _ = self.shutdown.triggered() => {
                    return Err(ServiceError::Failed {
                        service: service.name().to_string(),
                        reason: format!("shutdown while waiting for dependency <{dep}>"),
                    });
                }
                res = rx.wait_for(|running| *running) => {
                    if res.is_err() {
                        return Err(ServiceError::Failed {
                            service: service.name().to_string(),
                            reason: format!("dependency <{dep}> signal closed"),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// First dependency of `service` that is not currently Running, if any.
    async fn missing_dependency(&self, service: &ServiceRef) -> Option<String> {
        let services = self.services.read().await;
        service
            .dependencies()
            .into_iter()
            .find(|dep| !services.get(dep).is_some_and(|e| *e.running.borrow()))
    }

    async fn entry(&self, name: &str) -> Option<(ServiceRef, Arc<watch::Sender<bool>>)> {
        let services = self.services.read().await;
        services
            .get(name)
            .map(|e| (Arc::clone(&e.service), Arc::clone(&e.running)))
    }

    fn publish_failed(&self, name: &str, err: &ServiceError) {
        self.bus.publish(
            Event::new(EventKind::ServiceFailed)
                .with_name(name)
                .with_reason(err.to_string()),
        );
    }

    /// Dependency-respecting start order over all registered services.
    async fn topological_order(&self) -> Result<Vec<String>, ServiceError> {
        let services = self.services.read().await;
        let graph: HashMap<String, Vec<String>> = services
            .iter()
            .map(|(name, entry)| (name.clone(), entry.service.dependencies()))
            .collect();

        for (name, deps) in &graph {
            for dep in deps {
                if !graph.contains_key(dep) {
                    return Err(ServiceError::UnknownDependency {
                        service: name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        // Kahn's algorithm, name-sorted for deterministic order.
        let mut indegree: HashMap<&str, usize> =
            graph.keys().map(|name| (name.as_str(), 0)).collect();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for (name, deps) in &graph {
            for dep in deps {
                *indegree.entry(name.as_str()).or_default() += 1;
                dependents.entry(dep.as_str()).or_default().push(name.as_str());
            }
        }

        let mut ready: Vec<&str> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(n, _)| *n)
            .collect();
        ready.sort_unstable();

        let mut order = Vec::with_capacity(graph.len());
        while let Some(name) = ready.first().copied() {
            ready.remove(0);
            order.push(name.to_string());
            for dependent in dependents.remove(name).unwrap_or_default() {
                if let Some(d) = indegree.get_mut(dependent) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(dependent);
                        ready.sort_unstable();
                    }
                }
            }
        }
        Ok(order)
    }
}

/// Rejects dependency cycles with a readable path.
fn detect_cycle(graph: &HashMap<String, Vec<String>>) -> Result<(), ServiceError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        InProgress,
        Done,
    }

    fn visit(
        node: &str,
        graph: &HashMap<String, Vec<String>>,
        marks: &mut HashMap<String, Mark>,
        path: &mut Vec<String>,
    ) -> Result<(), ServiceError> {
        match marks.get(node) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                let start = path.iter().position(|n| n == node).unwrap_or(0);
                let mut cycle: Vec<&str> = path[start..].iter().map(String::as_str).collect();
                cycle.push(node);
                return Err(ServiceError::DependencyCycle {
                    path: cycle.join(" -> "),
                });
            }
            None => {}
        }

        marks.insert(node.to_string(), Mark::InProgress);
        path.push(node.to_string());
        if let Some(deps) = graph.get(node) {
            for dep in deps {
                // Unknown deps are resolved at start time, not here.
                if graph.contains_key(dep) {
                    visit(dep, graph, marks, path)?;
                }
            }
        }
        path.pop();
        marks.insert(node.to_string(), Mark::Done);
        Ok(())
    }

    let mut marks = HashMap::new();
    let mut names: Vec<&String> = graph.keys().collect();
    names.sort_unstable();
    for name in names {
        visit(name, graph, &mut marks, &mut Vec::new())?;
    }
    Ok(())
}
