//! # Reader registry - lock-guarded map of live readers.
//!
//! The registry owns every live reader: the reader itself, its driving
//! actor's join handle, and the actor's cancellation token, bucketed by
//! ingestion group.
//!
//! ## Rules
//! - Every reader id appears at most once across the **whole** registry;
//!   grouping is only locality of iteration, not a uniqueness scope.
//! - Mutation happens under the exclusive lock; diffing uses [`snapshot`]
//!   so the lock is never held across a configuration scan.
//! - Removal is keyed by id: the position is looked up under the same write
//!   lock that performs the removal. Positions are never captured ahead of
//!   a batch of removals - earlier removals would invalidate them.
//! - `processed()`/`id()` reads go through [`readers`] clones and take no
//!   registry lock.
//!
//! [`snapshot`]: ReaderRegistry::snapshot
//! [`readers`]: ReaderRegistry::readers

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::RegistryError;
use crate::events::{Bus, Event, EventKind};
use crate::readers::ReaderRef;

/// Live reader plus its driving actor's handles.
struct ReaderSlot {
    id: Arc<str>,
    reader: ReaderRef,
    join: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Lock-guarded mapping of ingestion group to its ordered live readers.
///
/// Owns its slots exclusively; the only aliases that escape are the
/// `Arc<dyn Reader>` clones handed to driving actors and to
/// [`readers`](ReaderRegistry::readers) callers.
pub struct ReaderRegistry {
    groups: RwLock<HashMap<String, Vec<ReaderSlot>>>,
    bus: Bus,
}

impl ReaderRegistry {
    /// Creates an empty registry.
    pub fn new(bus: Bus) -> Arc<Self> {
        Arc::new(Self {
            groups: RwLock::new(HashMap::new()),
            bus,
        })
    }

    /// Appends a reader under its group.
    ///
    /// Fails only on a duplicate id anywhere in the registry - an invariant
    /// violation a correct reconciler never produces.
    pub async fn insert(
        &self,
        group: &str,
        reader: ReaderRef,
        join: JoinHandle<()>,
        cancel: CancellationToken,
    ) -> Result<(), RegistryError> {
        let id: Arc<str> = Arc::from(reader.id());
        let mut groups = self.groups.write().await;

        if groups
            .values()
            .flatten()
            .any(|slot| slot.id.as_ref() == id.as_ref())
        {
            return Err(RegistryError::DuplicateId { id: id.to_string() });
        }

        groups.entry(group.to_string()).or_default().push(ReaderSlot {
            id,
            reader,
            join,
            cancel,
        });
        Ok(())
    }

    /// Closes and deregisters the reader with the given id.
    ///
    /// The slot is located by id and taken out under the write lock; the
    /// actor is then cancelled, the reader closed, and the actor joined
    /// without holding the lock. Returns `false` when the id is not
    /// registered.
    pub async fn remove_by_id(&self, id: &str) -> bool {
        let taken = {
            let mut groups = self.groups.write().await;
            let mut taken: Option<(String, ReaderSlot)> = None;
            for (group, slots) in groups.iter_mut() {
                if let Some(pos) = slots.iter().position(|slot| slot.id.as_ref() == id) {
                    taken = Some((group.clone(), slots.remove(pos)));
                    break;
                }
            }
            groups.retain(|_, slots| !slots.is_empty());
            taken
        };

        let Some((group, slot)) = taken else {
            return false;
        };

        self.retire(slot).await;
        self.bus.publish(
            Event::new(EventKind::ReaderRemoved)
                .with_name(id)
                .with_group(group),
        );
        true
    }

    /// Returns a read-only id → group view for diffing.
    pub async fn snapshot(&self) -> HashMap<String, String> {
        let groups = self.groups.read().await;
        let mut view = HashMap::new();
        for (group, slots) in groups.iter() {
            for slot in slots {
                view.insert(slot.id.to_string(), group.clone());
            }
        }
        view
    }

    /// Clones of all live readers, for lock-free `processed()`/`id()` reads.
    pub async fn readers(&self) -> Vec<ReaderRef> {
        let groups = self.groups.read().await;
        groups
            .values()
            .flatten()
            .map(|slot| Arc::clone(&slot.reader))
            .collect()
    }

    /// Sorted list of registered reader ids.
    pub async fn list(&self) -> Vec<String> {
        let groups = self.groups.read().await;
        let mut ids: Vec<String> = groups
            .values()
            .flatten()
            .map(|slot| slot.id.to_string())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered readers.
    pub async fn len(&self) -> usize {
        self.groups.read().await.values().map(Vec::len).sum()
    }

    /// True if no readers are registered.
    pub async fn is_empty(&self) -> bool {
        self.groups.read().await.values().all(Vec::is_empty)
    }

    /// Closes every reader and joins every actor: the shutdown path.
    pub async fn close_all(&self) {
        let drained: Vec<(String, ReaderSlot)> = {
            let mut groups = self.groups.write().await;
            groups
                .drain()
                .flat_map(|(group, slots)| {
                    slots.into_iter().map(move |slot| (group.clone(), slot))
                })
                .collect()
        };

        for (_, slot) in &drained {
            slot.cancel.cancel();
        }

        for (group, slot) in drained {
            let id = slot.id.to_string();
            self.retire(slot).await;
            self.bus.publish(
                Event::new(EventKind::ReaderRemoved)
                    .with_name(id)
                    .with_group(group),
            );
        }
    }

    /// Cancel the actor, close the reader, and wait for the actor to exit.
    async fn retire(&self, slot: ReaderSlot) {
        slot.cancel.cancel();
        let _ = slot.reader.close().await;
        let _ = slot.join.await;
    }
}
