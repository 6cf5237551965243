//! Fire-and-forget persistence of player records.
//!
//! The simulation mutates stats many times per second; the external player
//! record store lives behind a network hop. The bridge keeps the two apart:
//! components call [`PersistenceBridge::save`], which pushes the record onto
//! an unbounded channel and returns immediately -- a slow or failing store
//! can never stall the tick that triggered the save.
//!
//! A dedicated worker thread owns the [`PlayerStore`] implementation and the
//! handle -> store-id cache. The first save for a handle with no cached id
//! issues a create and caches the returned id for all subsequent updates; a
//! failed create leaves the entity operating in-memory-only (logged, retried
//! on its next save). Save results never flow back into simulation state --
//! the local record is authoritative and the store is a downstream mirror.
//! Failures are additionally surfaced on a drainable error feed for an
//! optional UI consumer.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use serde::{Deserialize, Serialize};

use crate::stats::StatSheet;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Identifier assigned by the external store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreId(pub u64);

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The player record as the store sees it (snake_case JSON field names are
/// the wire contract).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub username: String,
    pub health: u32,
    pub max_health: u32,
    pub strength: u32,
    pub wisdomness: u32,
    pub benchpress: u32,
    pub curl: u32,
    pub experience: u64,
    pub level: u32,
}

impl PlayerRecord {
    /// Snapshot a stat sheet into a store record.
    pub fn from_sheet(username: &str, sheet: &StatSheet) -> Self {
        Self {
            username: username.to_owned(),
            health: sheet.health,
            max_health: sheet.max_health,
            strength: sheet.strength,
            wisdomness: sheet.wisdomness,
            benchpress: sheet.benchpress,
            curl: sheet.curl,
            experience: sheet.experience,
            level: sheet.level,
        }
    }
}

// ---------------------------------------------------------------------------
// PlayerStore
// ---------------------------------------------------------------------------

/// Errors a store backend can produce.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The store reached a decision and said no (validation, conflicts).
    #[error("store rejected the record: {reason}")]
    Rejected { reason: String },

    /// The store could not be reached at all.
    #[error("store unreachable: {details}")]
    Unreachable { details: String },
}

/// Narrow interface to the external player record store.
///
/// The concrete HTTP/SQL backend lives outside the simulation; the worker
/// thread is the only caller, so implementations may block freely.
pub trait PlayerStore: Send + 'static {
    /// Create a new record, returning its store-assigned id.
    fn create_player(&mut self, record: &PlayerRecord) -> Result<StoreId, StoreError>;

    /// Overwrite the record behind `id`.
    fn update_player(&mut self, id: StoreId, record: &PlayerRecord) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// PersistenceBridge
// ---------------------------------------------------------------------------

/// Per-entity slot in the bridge. Opaque to the simulation: the store id it
/// maps to lives in the worker, never in component state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordHandle(u32);

enum Job {
    Register {
        handle: RecordHandle,
        existing: Option<StoreId>,
    },
    Save {
        handle: RecordHandle,
        record: PlayerRecord,
    },
}

/// Cloneable, non-blocking handle to the persistence worker.
///
/// The worker thread exits once every clone of the bridge is dropped.
#[derive(Clone)]
pub struct PersistenceBridge {
    tx: Sender<Job>,
    next_handle: Arc<AtomicU32>,
}

impl PersistenceBridge {
    /// Start a worker thread around `store`.
    ///
    /// Returns the bridge and the error feed for an optional UI consumer.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn the worker thread.
    pub fn spawn(store: impl PlayerStore) -> (Self, SaveErrors) {
        let (tx, rx) = mpsc::channel();
        let (err_tx, err_rx) = mpsc::channel();
        thread::Builder::new()
            .name("mire-persist".to_owned())
            .spawn(move || worker(store, rx, err_tx))
            .expect("failed to spawn persistence worker thread");
        (
            Self {
                tx,
                next_handle: Arc::new(AtomicU32::new(0)),
            },
            SaveErrors { rx: err_rx },
        )
    }

    /// Allocate a record slot, optionally seeded with an id already known
    /// from a previous session.
    pub fn register(&self, existing: Option<StoreId>) -> RecordHandle {
        let handle = RecordHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        if self.tx.send(Job::Register { handle, existing }).is_err() {
            tracing::warn!("persistence worker is gone; registration dropped");
        }
        handle
    }

    /// Queue a save. Never blocks; result is fire-and-forget.
    pub fn save(&self, handle: RecordHandle, record: PlayerRecord) {
        if self.tx.send(Job::Save { handle, record }).is_err() {
            tracing::warn!(handle = handle.0, "persistence worker is gone; save dropped");
        }
    }
}

impl fmt::Debug for PersistenceBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceBridge").finish_non_exhaustive()
    }
}

/// Drainable feed of store failures, consumed outside the simulation loop.
pub struct SaveErrors {
    rx: Receiver<StoreError>,
}

impl SaveErrors {
    /// Non-blocking receive of a single error.
    pub fn try_next(&self) -> Option<StoreError> {
        self.rx.try_recv().ok()
    }

    /// Drain all currently queued errors.
    pub fn drain(&self) -> Vec<StoreError> {
        let mut out = Vec::new();
        while let Some(e) = self.try_next() {
            out.push(e);
        }
        out
    }
}

fn worker(mut store: impl PlayerStore, rx: Receiver<Job>, err_tx: Sender<StoreError>) {
    let mut ids: HashMap<RecordHandle, StoreId> = HashMap::new();
    for job in rx {
        match job {
            Job::Register { handle, existing } => {
                if let Some(id) = existing {
                    ids.insert(handle, id);
                }
            }
            Job::Save { handle, record } => match ids.get(&handle) {
                Some(&id) => {
                    if let Err(error) = store.update_player(id, &record) {
                        tracing::warn!(%id, %error, "player update failed; local state stays authoritative");
                        let _ = err_tx.send(error);
                    }
                }
                None => match store.create_player(&record) {
                    Ok(id) => {
                        tracing::info!(%id, username = %record.username, "player record created");
                        ids.insert(handle, id);
                    }
                    Err(error) => {
                        tracing::warn!(%error, "player create failed; continuing in-memory only");
                        let _ = err_tx.send(error);
                    }
                },
            },
        }
    }
    tracing::debug!("persistence worker shutting down");
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory [`PlayerStore`] used by tests and the headless demo.
///
/// Clones share the same record map, so a test can hold one clone for
/// inspection while the worker owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
    /// When set, `create_player` fails -- exercises the in-memory-only path.
    refuse_creates: bool,
}

#[derive(Debug, Default)]
struct MemoryInner {
    next_id: u64,
    records: HashMap<StoreId, PlayerRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose creates always fail.
    pub fn refusing_creates() -> Self {
        Self {
            inner: Arc::default(),
            refuse_creates: true,
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("store lock poisoned").records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch a record copy by id.
    pub fn get(&self, id: StoreId) -> Option<PlayerRecord> {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .records
            .get(&id)
            .cloned()
    }

    /// Copy of all records, sorted by id.
    pub fn snapshot(&self) -> Vec<(StoreId, PlayerRecord)> {
        let inner = self.inner.lock().expect("store lock poisoned");
        let mut out: Vec<_> = inner
            .records
            .iter()
            .map(|(id, r)| (*id, r.clone()))
            .collect();
        out.sort_by_key(|(id, _)| id.0);
        out
    }
}

impl PlayerStore for MemoryStore {
    fn create_player(&mut self, record: &PlayerRecord) -> Result<StoreId, StoreError> {
        if self.refuse_creates {
            return Err(StoreError::Unreachable {
                details: "create refused".to_owned(),
            });
        }
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.next_id += 1;
        let id = StoreId(inner.next_id);
        inner.records.insert(id, record.clone());
        Ok(id)
    }

    fn update_player(&mut self, id: StoreId, record: &PlayerRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        match inner.records.get_mut(&id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(())
            }
            None => Err(StoreError::Rejected {
                reason: format!("no record with id {id}"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record(username: &str, health: u32) -> PlayerRecord {
        let mut sheet = StatSheet::player_default();
        sheet.health = health;
        PlayerRecord::from_sheet(username, &sheet)
    }

    /// Wait for the worker to drain, bounded so a broken worker fails the
    /// test instead of hanging it.
    fn settle(store: &MemoryStore, expected: usize) {
        for _ in 0..200 {
            if store.len() >= expected {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn first_save_creates_then_updates() {
        let store = MemoryStore::new();
        let (bridge, _errors) = PersistenceBridge::spawn(store.clone());

        let handle = bridge.register(None);
        bridge.save(handle, record("grok", 100));
        settle(&store, 1);
        assert_eq!(store.len(), 1, "first save issues a create");

        bridge.save(handle, record("grok", 40));
        drop(bridge); // worker drains the queue, then exits
        for _ in 0..200 {
            if store.get(StoreId(1)).map(|r| r.health) == Some(40) {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(store.len(), 1, "second save updates in place");
        assert_eq!(store.get(StoreId(1)).unwrap().health, 40);
    }

    #[test]
    fn registered_id_skips_create() {
        let store = MemoryStore::new();
        // Pre-seed a record as if from a previous session.
        let existing = {
            let mut seed = store.clone();
            seed.create_player(&record("grok", 77)).unwrap()
        };

        let (bridge, _errors) = PersistenceBridge::spawn(store.clone());
        let handle = bridge.register(Some(existing));
        bridge.save(handle, record("grok", 12));
        drop(bridge);
        for _ in 0..200 {
            if store.get(existing).map(|r| r.health) == Some(12) {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(store.len(), 1, "no second record was created");
        assert_eq!(store.get(existing).unwrap().health, 12);
    }

    #[test]
    fn failed_create_surfaces_error_and_keeps_running() {
        let store = MemoryStore::refusing_creates();
        let (bridge, errors) = PersistenceBridge::spawn(store.clone());

        let handle = bridge.register(None);
        bridge.save(handle, record("grok", 100));
        drop(bridge);

        // Wait for the worker to finish, then drain.
        for _ in 0..200 {
            if errors.try_next().is_some() {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("expected a StoreError on the feed");
    }

    #[test]
    fn record_wire_shape_is_snake_case() {
        let mut sheet = StatSheet::player_default();
        sheet.max_health = 110;
        let json = serde_json::to_value(PlayerRecord::from_sheet("grok", &sheet)).unwrap();
        assert_eq!(json["username"], "grok");
        assert_eq!(json["max_health"], 110);
        assert_eq!(json["wisdomness"], 5);
        assert_eq!(json["benchpress"], 20);

        let back: PlayerRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, PlayerRecord::from_sheet("grok", &sheet));
    }

    #[test]
    fn handles_are_distinct_records() {
        let store = MemoryStore::new();
        let (bridge, _errors) = PersistenceBridge::spawn(store.clone());

        let a = bridge.register(None);
        let b = bridge.register(None);
        bridge.save(a, record("grok", 100));
        bridge.save(b, record("mosh", 50));
        drop(bridge);
        settle(&store, 2);

        let names: Vec<String> = store
            .snapshot()
            .into_iter()
            .map(|(_, r)| r.username)
            .collect();
        assert_eq!(store.len(), 2);
        assert!(names.contains(&"grok".to_owned()));
        assert!(names.contains(&"mosh".to_owned()));
    }
}
