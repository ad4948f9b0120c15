//! Persistence adapter: load-or-seed on open, debounced writes afterwards.
//!
//! - **Load**: both records are read and decoded; if either is missing or
//!   malformed the built-in seed document is used instead. Decoding
//!   backfills fields older records lack (see [`kmap_core::record`]).
//!
//! - **Save**: the adapter subscribes to the store, ignores the replay of
//!   the already-loaded snapshot, and forwards every later publication to a
//!   writer thread. The writer holds the latest snapshot until `debounce`
//!   has passed without a newer one, then writes both records once.
//!
//! Load and write failures are logged and absorbed; nothing here ever
//! reaches the store or its callers as an error.

mod seed;
mod storage;

pub use seed::seed_snapshot;
pub use storage::{FileStorage, MemoryStorage, SnapshotStorage, StorageError};

use crate::store::{MapStore, ScopedSubscription, StoreConfig};
use kmap_core::record::{decode_edges, decode_nodes, encode_edges, encode_nodes};
use kmap_core::{Snapshot, lint_snapshot};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
pub const NODES_KEY: &str = "knowledgeMapNodes";
pub const EDGES_KEY: &str = "knowledgeMapEdges";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistConfig {
    /// Quiet period after the last publication before writing.
    pub debounce: Duration,
    pub nodes_key: String,
    pub edges_key: String,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            nodes_key: NODES_KEY.to_string(),
            edges_key: EDGES_KEY.to_string(),
        }
    }
}

impl PersistConfig {
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    #[must_use]
    pub fn with_keys(mut self, nodes_key: impl Into<String>, edges_key: impl Into<String>) -> Self {
        self.nodes_key = nodes_key.into();
        self.edges_key = edges_key.into();
        self
    }
}

// ─── Load / save ─────────────────────────────────────────────────────────

/// Read the persisted document, or `Ok(None)` if either record is absent.
pub fn read_snapshot(
    storage: &dyn SnapshotStorage,
    config: &PersistConfig,
) -> Result<Option<Snapshot>, StorageError> {
    let Some(nodes) = storage.read(&config.nodes_key)? else {
        return Ok(None);
    };
    let Some(edges) = storage.read(&config.edges_key)? else {
        return Ok(None);
    };
    Ok(Some(Snapshot::new(decode_nodes(&nodes)?, decode_edges(&edges)?)))
}

/// Write both records of `snapshot`.
pub fn write_snapshot(
    storage: &dyn SnapshotStorage,
    config: &PersistConfig,
    snapshot: &Snapshot,
) -> Result<(), StorageError> {
    let nodes = encode_nodes(&snapshot.nodes)?;
    let edges = encode_edges(&snapshot.edges)?;
    storage.write(&config.nodes_key, &nodes)?;
    storage.write(&config.edges_key, &edges)?;
    Ok(())
}

/// The persisted document, falling back to [`seed_snapshot`]. Never fails.
pub fn load_or_seed(storage: &dyn SnapshotStorage, config: &PersistConfig) -> Snapshot {
    let snapshot = match read_snapshot(storage, config) {
        Ok(Some(snapshot)) => {
            log::info!(
                "loaded persisted map: {} nodes, {} edges",
                snapshot.nodes.len(),
                snapshot.edges.len()
            );
            snapshot
        }
        Ok(None) => {
            log::info!("no persisted map found, starting from seed");
            return seed_snapshot();
        }
        Err(err) => {
            log::warn!("failed to load persisted map, starting from seed: {err}");
            return seed_snapshot();
        }
    };
    for diag in lint_snapshot(&snapshot) {
        log::warn!("persisted map: {diag}");
    }
    snapshot
}

// ─── Writer ──────────────────────────────────────────────────────────────

enum WriterMsg {
    Snapshot(Box<Snapshot>),
    Flush(mpsc::Sender<()>),
    Shutdown,
}

/// Attached persistence for one store.
///
/// Dropping it writes any pending snapshot, stops the writer, and ends the
/// store subscription. [`detach`] does the same but removes the listener
/// from the store right away.
///
/// [`detach`]: Persistence::detach
pub struct Persistence {
    sender: mpsc::Sender<WriterMsg>,
    worker: Option<JoinHandle<()>>,
    subscription: ScopedSubscription,
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence")
            .field("subscription", &self.subscription.id())
            .field("running", &self.worker.is_some())
            .finish()
    }
}

impl Persistence {
    /// Load (or seed) a document and return a store with persistence attached.
    pub fn open(
        storage: Arc<dyn SnapshotStorage>,
        config: PersistConfig,
        store_config: StoreConfig,
    ) -> (MapStore, Persistence) {
        let initial = load_or_seed(storage.as_ref(), &config);
        let mut store = MapStore::with_snapshot(initial, store_config);
        let persistence = Persistence::attach(&mut store, storage, config);
        (store, persistence)
    }

    /// Start persisting every publication of `store` after the current one.
    pub fn attach(
        store: &mut MapStore,
        storage: Arc<dyn SnapshotStorage>,
        config: PersistConfig,
    ) -> Persistence {
        let (sender, receiver) = mpsc::channel();

        let worker = std::thread::Builder::new()
            .name("kmap-persist".to_owned())
            .spawn(move || run_writer(receiver, storage.as_ref(), &config));
        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(err) => {
                log::error!("could not start persistence writer, changes will not be saved: {err}");
                None
            }
        };

        let forward = sender.clone();
        let mut replayed = false;
        let subscription = store.subscribe_scoped(move |snapshot| {
            if !replayed {
                replayed = true;
                return;
            }
            let _ = forward.send(WriterMsg::Snapshot(Box::new(snapshot.clone())));
        });

        Persistence {
            sender,
            worker,
            subscription,
        }
    }

    /// Write any pending snapshot now and wait for it to finish.
    pub fn flush(&self) {
        if self.worker.is_none() {
            return;
        }
        let (ack, done) = mpsc::channel();
        if self.sender.send(WriterMsg::Flush(ack)).is_ok() {
            let _ = done.recv();
        }
    }

    /// Unsubscribe from `store`, flush, and stop the writer.
    pub fn detach(self, store: &mut MapStore) {
        store.unsubscribe(self.subscription.id());
    }
}

impl Drop for Persistence {
    fn drop(&mut self) {
        let _ = self.sender.send(WriterMsg::Shutdown);
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            log::error!("persistence writer panicked");
        }
    }
}

fn run_writer(
    receiver: mpsc::Receiver<WriterMsg>,
    storage: &dyn SnapshotStorage,
    config: &PersistConfig,
) {
    let mut pending: Option<Box<Snapshot>> = None;
    loop {
        let msg = if pending.is_some() {
            match receiver.recv_timeout(config.debounce) {
                Ok(msg) => msg,
                Err(RecvTimeoutError::Timeout) => {
                    save(storage, config, pending.take());
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    save(storage, config, pending.take());
                    return;
                }
            }
        } else {
            match receiver.recv() {
                Ok(msg) => msg,
                Err(_) => return,
            }
        };

        match msg {
            // A newer snapshot restarts the debounce window.
            WriterMsg::Snapshot(snapshot) => pending = Some(snapshot),
            WriterMsg::Flush(ack) => {
                save(storage, config, pending.take());
                let _ = ack.send(());
            }
            WriterMsg::Shutdown => {
                save(storage, config, pending.take());
                return;
            }
        }
    }
}

fn save(storage: &dyn SnapshotStorage, config: &PersistConfig, snapshot: Option<Box<Snapshot>>) {
    let Some(snapshot) = snapshot else {
        return;
    };
    match write_snapshot(storage, config, &snapshot) {
        Ok(()) => log::debug!(
            "map saved: {} nodes, {} edges",
            snapshot.nodes.len(),
            snapshot.edges.len()
        ),
        Err(err) => log::warn!("failed to save map, will retry on next change: {err}"),
    }
}
