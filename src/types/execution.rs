//! The record produced by speculatively executing one block.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::basic::{CryptoHash, WriteSet};

/// The result of executing one block against the ledger's current state: the state diff the
/// block produced and the merkle root of the state after applying it.
///
/// Produced once per block, immutable thereafter. The `merkle_root` is only meaningful relative
/// to the root at the previous height; root chains must be unbroken across the durable/pending
/// boundary.
#[derive(Clone, BorshSerialize, BorshDeserialize)]
pub struct ExecutionResult {
    pub write_set: WriteSet,
    pub merkle_root: CryptoHash,
}

impl ExecutionResult {
    /// An execution result with an empty write-set at a known root. Used to seed the pending
    /// cache with an already-durable height.
    pub fn settled_at(merkle_root: CryptoHash) -> ExecutionResult {
        ExecutionResult {
            write_set: WriteSet::new(),
            merkle_root,
        }
    }
}
