//! Checkpoint abstraction for node memories.
//!
//! Nodes persist their working memory through the [`MemoryStore`] trait;
//! the reference implementation is an in-memory map, and the MessagePack
//! helpers let a durable backend store the same memories as bytes without
//! any node-code changes.

use std::collections::HashMap;

use parking_lot::RwLock;

use weft_foundation::{Error, ErrorKind, Result};

use crate::memory::WorkingMemory;

/// Pluggable persistence backend for node working memories.
///
/// Implementations must be safe to call from concurrently-activating
/// nodes.
pub trait MemoryStore: Send + Sync {
    /// Saves a snapshot of a node's memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot store the snapshot.
    fn save_memory(&self, node_id: &str, memory: &WorkingMemory) -> Result<()>;

    /// Loads the stored memory for a node, or `None` if none was saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot read the snapshot.
    fn load_memory(&self, node_id: &str) -> Result<Option<WorkingMemory>>;

    /// Deletes the stored memory for a node, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot delete the snapshot.
    fn delete_memory(&self, node_id: &str) -> Result<()>;

    /// Lists the node ids with stored memories.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot enumerate snapshots.
    fn list_nodes(&self) -> Result<Vec<String>>;
}

/// Reference [`MemoryStore`] backed by a protected in-memory map.
#[derive(Default)]
pub struct InMemoryStore {
    memories: RwLock<HashMap<String, WorkingMemory>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryStore for InMemoryStore {
    fn save_memory(&self, node_id: &str, memory: &WorkingMemory) -> Result<()> {
        self.memories
            .write()
            .insert(node_id.to_string(), memory.clone());
        Ok(())
    }

    fn load_memory(&self, node_id: &str) -> Result<Option<WorkingMemory>> {
        Ok(self.memories.read().get(node_id).cloned())
    }

    fn delete_memory(&self, node_id: &str) -> Result<()> {
        self.memories.write().remove(node_id);
        Ok(())
    }

    fn list_nodes(&self) -> Result<Vec<String>> {
        let mut nodes: Vec<String> = self.memories.read().keys().cloned().collect();
        nodes.sort();
        Ok(nodes)
    }
}

/// Serializes a working memory to bytes using `MessagePack` format.
///
/// Uses named serialization to preserve struct field names.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_bytes(memory: &WorkingMemory) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(memory)
        .map_err(|e| Error::new(ErrorKind::Serialization(e.to_string())))
}

/// Deserializes a working memory from `MessagePack` bytes.
///
/// # Errors
///
/// Returns an error if deserialization fails.
pub fn from_bytes(bytes: &[u8]) -> Result<WorkingMemory> {
    rmp_serde::from_slice(bytes)
        .map_err(|e| Error::new(ErrorKind::Serialization(e.to_string())))
}
