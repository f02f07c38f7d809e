//! Durable state: snapshot format and file persistence.

mod snapshot;


pub use snapshot::{
    create_snapshot, load_snapshot, load_snapshot_from_file, save_snapshot_to_file, MemoryState,
    SnapshotError, SNAPSHOT_MAGIC, SNAPSHOT_VERSION,
};
