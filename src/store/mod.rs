//! Rolling sample history and last-known state persistence.

mod persistence;
mod sample_store;

pub use persistence::{
    CachedViewState, FileKeyValueStore, KEY_PREFIX, KeyValueStore, MemoryKeyValueStore,
    PersistenceAdapter,
};
pub use sample_store::SampleStore;
