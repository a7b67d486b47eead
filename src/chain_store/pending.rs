//! The in-memory cache of agreed-but-not-yet-durable blocks.

use std::collections::HashMap;

use crate::types::{basic::BlockHeight, block::Block, execution::ExecutionResult};

/// One agreed block together with its speculative execution record.
///
/// An entry exists only while the block's durable submission has not yet completed, or has
/// completed but the entry is retained for exactly one more cycle to serve root and write-set
/// reads.
pub(crate) struct PendingEntry {
    pub(crate) block: Block,
    pub(crate) exec_result: ExecutionResult,
    pub(crate) submitted: bool,
}

/// Height-keyed map of [`PendingEntry`]s with the narrow API the chain store needs.
pub(crate) struct PendingBlocks(HashMap<BlockHeight, PendingEntry>);

impl PendingBlocks {
    pub(crate) fn new() -> Self {
        Self(HashMap::new())
    }

    pub(crate) fn get(&self, height: BlockHeight) -> Option<&PendingEntry> {
        self.0.get(&height)
    }

    pub(crate) fn insert(&mut self, height: BlockHeight, entry: PendingEntry) {
        self.0.insert(height, entry);
    }

    /// Mark the entry at `height`, if present, as durably submitted.
    pub(crate) fn set_submitted(&mut self, height: BlockHeight) {
        if let Some(entry) = self.0.get_mut(&height) {
            entry.submitted = true;
        }
    }

    /// Remove the entry at `height`. Returns whether an entry was present.
    pub(crate) fn remove(&mut self, height: BlockHeight) -> bool {
        self.0.remove(&height).is_some()
    }

    /// Drop every entry at or below `height`, keeping only entries strictly above it.
    pub(crate) fn retain_above(&mut self, height: BlockHeight) {
        self.0.retain(|entry_height, _| *entry_height > height);
    }
}
