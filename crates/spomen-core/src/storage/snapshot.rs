//! Snapshot persistence for graph state and conversation rate state.
//!
//! Pending questions and activation results are transient and deliberately
//! absent: after a restart, the graph and the per-conversation delivery
//! budgets are what must survive.
//!
//! # Snapshot Format
//!
//! ```text
//! [Magic: "SPMN" 4 bytes]
//! [Version: 1 byte]
//! [Nodes length: 8 bytes]
//! [Nodes: bincode, N bytes]
//! [Edges length: 8 bytes]
//! [Edges: bincode, N bytes]
//! [Rate states length: 8 bytes]
//! [Rate states: bincode, N bytes]
//! [CRC32: 4 bytes]
//! ```
//!
//! Writes go through a temp file plus rename, so a crash mid-write leaves
//! the previous snapshot intact; the CRC over everything before it catches
//! truncation and bit rot on load.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::curiosity::ConversationRateState;
use crate::graph::{GraphStore, MemoryEdge, MemoryNode};

/// Snapshot file magic bytes.
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"SPMN";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u8 = 1;

/// Simple CRC32 implementation (IEEE 802.3 polynomial).
#[inline]
pub(crate) fn crc32_hash(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let idx = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[idx];
    }
    !crc
}

/// Error type for snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Invalid magic bytes.
    #[error("invalid snapshot magic bytes")]
    InvalidMagic,

    /// Unsupported version.
    #[error("unsupported snapshot version: {0}")]
    UnsupportedVersion(u8),

    /// CRC checksum mismatch.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Checksum stored in the file.
        expected: u32,
        /// Checksum computed over the file contents.
        actual: u32,
    },

    /// Data corruption or truncation.
    #[error("corrupted snapshot: {0}")]
    Corrupted(String),

    /// A section failed to encode or decode.
    #[error("snapshot encoding failed: {0}")]
    Encoding(String),
}

/// Everything a snapshot persists.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    /// All nodes of both spaces.
    pub nodes: Vec<MemoryNode>,
    /// All edges of both spaces.
    pub edges: Vec<MemoryEdge>,
    /// Per-conversation delivery budgets.
    pub rate_states: Vec<(String, ConversationRateState)>,
}

impl MemoryState {
    /// Captures a store's contents plus the given rate states.
    #[must_use]
    pub fn capture(store: &GraphStore, rate_states: Vec<(String, ConversationRateState)>) -> Self {
        Self {
            nodes: store.export_nodes(),
            edges: store.export_edges(),
            rate_states,
        }
    }

    /// Rebuilds a graph store from the captured state.
    #[must_use]
    pub fn restore_graph(&self) -> GraphStore {
        GraphStore::from_export(self.nodes.clone(), self.edges.clone())
    }
}

/// Serializes state into snapshot bytes.
///
/// # Errors
///
/// Returns [`SnapshotError::Encoding`] if a section fails to serialize.
pub fn create_snapshot(state: &MemoryState) -> Result<Vec<u8>, SnapshotError> {
    let nodes = encode(&state.nodes)?;
    let edges = encode(&state.edges)?;
    let rates = encode(&state.rate_states)?;

    let total = 4 + 1 + (8 + nodes.len()) + (8 + edges.len()) + (8 + rates.len()) + 4;
    let mut buf = Vec::with_capacity(total);
    buf.extend_from_slice(SNAPSHOT_MAGIC);
    buf.push(SNAPSHOT_VERSION);
    for section in [&nodes, &edges, &rates] {
        buf.extend_from_slice(&(section.len() as u64).to_le_bytes());
        buf.extend_from_slice(section);
    }

    let crc = crc32_hash(&buf);
    buf.extend_from_slice(&crc.to_le_bytes());
    Ok(buf)
}

/// Parses snapshot bytes back into state.
///
/// # Errors
///
/// Returns an error if the snapshot is invalid or corrupted.
pub fn load_snapshot(data: &[u8]) -> Result<MemoryState, SnapshotError> {
    const MIN_SIZE: usize = 4 + 1 + 8 * 3 + 4;

    if data.len() < MIN_SIZE {
        return Err(SnapshotError::Corrupted("snapshot too small".to_string()));
    }
    if &data[0..4] != SNAPSHOT_MAGIC {
        return Err(SnapshotError::InvalidMagic);
    }
    let version = data[4];
    if version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(version));
    }

    let stored_crc = u32::from_le_bytes(
        data[data.len() - 4..]
            .try_into()
            .map_err(|_| SnapshotError::Corrupted("invalid CRC bytes".to_string()))?,
    );
    let computed_crc = crc32_hash(&data[..data.len() - 4]);
    if stored_crc != computed_crc {
        return Err(SnapshotError::ChecksumMismatch {
            expected: stored_crc,
            actual: computed_crc,
        });
    }

    let body_end = data.len() - 4;
    let mut offset = 5;
    let nodes_raw = read_section(data, &mut offset, body_end, "nodes")?;
    let edges_raw = read_section(data, &mut offset, body_end, "edges")?;
    let rates_raw = read_section(data, &mut offset, body_end, "rate states")?;

    Ok(MemoryState {
        nodes: decode(nodes_raw)?,
        edges: decode(edges_raw)?,
        rate_states: decode(rates_raw)?,
    })
}

/// Saves a snapshot to a file, atomically via temp file + rename.
///
/// # Errors
///
/// Returns an error if encoding or file operations fail.
pub fn save_snapshot_to_file<P: AsRef<Path>>(
    path: P,
    state: &MemoryState,
) -> Result<(), SnapshotError> {
    let path = path.as_ref();
    let data = create_snapshot(state)?;

    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;
    file.write_all(&data)?;
    file.sync_all()?;
    drop(file);
    std::fs::rename(&temp_path, path)?;

    info!(
        path = %path.display(),
        bytes = data.len(),
        nodes = state.nodes.len(),
        edges = state.edges.len(),
        "snapshot written"
    );
    Ok(())
}

/// Loads a snapshot from a file.
///
/// # Errors
///
/// Returns an error if file operations fail or the snapshot is invalid.
pub fn load_snapshot_from_file<P: AsRef<Path>>(path: P) -> Result<MemoryState, SnapshotError> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    let state = load_snapshot(&data)?;
    info!(
        path = %path.display(),
        nodes = state.nodes.len(),
        edges = state.edges.len(),
        "snapshot restored"
    );
    Ok(state)
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, SnapshotError> {
    bincode::serialize(value).map_err(|e| SnapshotError::Encoding(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(raw: &[u8]) -> Result<T, SnapshotError> {
    bincode::deserialize(raw).map_err(|e| SnapshotError::Encoding(e.to_string()))
}

fn read_section<'a>(
    data: &'a [u8],
    offset: &mut usize,
    body_end: usize,
    name: &str,
) -> Result<&'a [u8], SnapshotError> {
    let len_end = offset
        .checked_add(8)
        .filter(|end| *end <= body_end)
        .ok_or_else(|| SnapshotError::Corrupted(format!("{name} length truncated")))?;
    let len_bytes: [u8; 8] = data[*offset..len_end]
        .try_into()
        .map_err(|_| SnapshotError::Corrupted(format!("invalid {name} length bytes")))?;
    let len = usize::try_from(u64::from_le_bytes(len_bytes))
        .map_err(|_| SnapshotError::Corrupted(format!("{name} length overflows")))?;
    // `len` comes straight from the file; checked math turns an oversized
    // value into `Corrupted` instead of a panic.
    let section_end = len_end
        .checked_add(len)
        .filter(|end| *end <= body_end)
        .ok_or_else(|| SnapshotError::Corrupted(format!("{name} data truncated")))?;
    let section = &data[len_end..section_end];
    *offset = section_end;
    Ok(section)
}
