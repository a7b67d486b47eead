//! Defines the [`Ledger`] trait, which specifies the required interface for the durable
//! block-and-state store provided by the user.
//!
//! The commit pipeline does not persist anything itself. It consumes five primitives of the
//! ledger: the durable height, state merkle root lookup, speculative block execution (no durable
//! side effect), durable block submission, and raw block lookup. Any store that can provide
//! these — an embedded KV store, an RPC proxy to a storage daemon, an in-memory double in tests —
//! can sit below a [`ChainStore`](crate::chain_store::ChainStore).
//!
//! Ledger calls are synchronous and block the calling admission cycle. Their latency is
//! overlapped across cycles by the chain store's one-block flush lag, not hidden behind
//! background threads. No timeouts are imposed here: a stuck ledger call stalls admission.

use std::fmt::Display;

use crate::types::{
    basic::{BlockHeight, CryptoHash},
    block::Block,
    execution::ExecutionResult,
};

pub trait Ledger: Send + 'static {
    /// Get the height of the highest durably stored block.
    fn current_block_height(&self) -> BlockHeight;

    /// Get the merkle root of the world state as of the given (durable) height.
    fn state_merkle_root(&self, height: BlockHeight) -> Result<CryptoHash, LedgerError>;

    /// Execute `block` against the ledger's current state, producing the block's write-set and
    /// resulting state root. Must not have any durable side effect.
    fn execute_block(&self, block: &Block) -> Result<ExecutionResult, LedgerError>;

    /// Durably persist `block` together with its execution result. Implementations may treat
    /// redundant submissions of an already-stored height as a no-op.
    fn submit_block(
        &mut self,
        block: &Block,
        exec_result: &ExecutionResult,
    ) -> Result<(), LedgerError>;

    /// Get the durably stored block at the given height.
    ///
    /// The returned block carries a zeroed `prev_exec_root`; durable storage does not inline
    /// it, and [`ChainStore::block`](crate::chain_store::ChainStore::block) attaches the real
    /// one.
    fn block_by_height(&self, height: BlockHeight) -> Result<Block, LedgerError>;
}

/// Error returned by a [`Ledger`] primitive.
#[derive(Debug)]
pub enum LedgerError {
    RootNotFound { height: BlockHeight },
    BlockNotFound { height: BlockHeight },
    ExecuteFailed { height: BlockHeight, reason: String },
    SubmitFailed { height: BlockHeight, reason: String },
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::RootNotFound { height } => {
                write!(f, "no state merkle root at height {}", height)
            }
            LedgerError::BlockNotFound { height } => {
                write!(f, "no block at height {}", height)
            }
            LedgerError::ExecuteFailed { height, reason } => {
                write!(f, "executing block {} failed: {}", height, reason)
            }
            LedgerError::SubmitFailed { height, reason } => {
                write!(f, "submitting block {} failed: {}", height, reason)
            }
        }
    }
}
