pub mod history;
pub mod persist;
pub mod propagate;
pub mod selection;
pub mod store;

pub use history::{History, MAX_HISTORY_SIZE};
pub use persist::{
    FileStorage, MemoryStorage, PersistConfig, Persistence, SnapshotStorage, StorageError,
};
pub use propagate::apply_style_to_children;
pub use selection::{EditDraft, Selection, SelectionChange};
pub use store::{MapStore, ScopedSubscription, StoreConfig, StoreError, SubscriptionId};
