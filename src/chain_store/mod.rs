//! The chain store: an in-memory overlay over the durable [`Ledger`] that buffers one block's
//! worth of speculative execution ahead of durable commit.
//!
//! When consensus declares block N final, the store durably submits block N−1, speculatively
//! executes N against the ledger's current state, caches N's execution record, and notifies the
//! consensus engine — so agreement latency and storage-commit latency overlap instead of
//! serializing. This deliberate one-block commit lag is the store's whole reason to exist.
//!
//! # State variables
//!
//! |Variable|Type|Description|
//! |---|---|---|
//! |Chained Height|[`BlockHeight`]|Highest height admitted by this store. May exceed the ledger's durable height by at most one.|
//! |Pending Blocks|[`BlockHeight`] -> `PendingEntry`|Blocks that have been agreed but whose durable submission has not completed, plus the most recently submitted block, retained one extra cycle to serve root and write-set reads.|
//!
//! Invariants:
//! 1. `chained height >= ledger durable height` at all times.
//! 2. For every height `h` with `durable height < h <= chained height`, a pending entry exists.
//! 3. A pending entry's root is only meaningful relative to the root at `h - 1`; root chains are
//!    unbroken across the durable/pending boundary.
//! 4. The pending map never holds an entry for a height the ledger has independently advanced
//!    past (enforced by [`reload_from_ledger`](ChainStore::reload_from_ledger)).
//!
//! # Single-writer rule
//!
//! [`add_block`](ChainStore::add_block), [`submit_block`](ChainStore::submit_block) and
//! [`reload_from_ledger`](ChainStore::reload_from_ledger) mutate the two state variables without
//! internal locking, so all calls into one `ChainStore` must come from a single logical
//! execution context. The [`committer`](crate::committer) module provides an actor-mailbox
//! deployment that enforces this with a dedicated thread.

pub(crate) mod pending;

use std::sync::mpsc::Sender;
use std::time::SystemTime;

use crate::events::{
    ConsensusCompleteEvent, Event, InsertPendingEvent, PruneEntryEvent, ReloadChainEvent,
    SubmitBlockEvent,
};
use crate::ledger::{Ledger, LedgerError};
use crate::types::{
    basic::{BlockHeight, CryptoHash, WriteSet},
    block::Block,
    execution::ExecutionResult,
};

use pending::{PendingBlocks, PendingEntry};

/// The write handle over a [`Ledger`] that implements the speculative commit pipeline.
///
/// ## Categories of methods
///
/// `ChainStore`'s methods are grouped into four categories, with methods in each category
/// defined in a separate `impl` block:
/// 1. [Lifecycle methods](#impl-ChainStore<L>).
/// 2. [Admission and submission](#impl-ChainStore<L>-1).
/// 3. [Recovery](#impl-ChainStore<L>-2).
/// 4. [Getters](#impl-ChainStore<L>-3).
pub struct ChainStore<L: Ledger> {
    ledger: L,
    chained_height: BlockHeight,
    pending_blocks: PendingBlocks,
    event_publisher: Option<Sender<Event>>,
}

/// Lifecycle methods.
impl<L: Ledger> ChainStore<L> {
    /// Open a chain store over `ledger`, seeding the pending cache with one synthetic,
    /// already-submitted entry at the ledger's current durable height.
    ///
    /// The seed entry carries the durable state root and an empty write-set, which lets the
    /// read accessors treat "already durable" and "just admitted" heights uniformly.
    ///
    /// Fails if the ledger cannot produce a state root or block at its own reported height:
    /// without a trusted baseline the store cannot start.
    pub fn open(
        ledger: L,
        event_publisher: Option<Sender<Event>>,
    ) -> Result<ChainStore<L>, ChainStoreError> {
        let chained_height = ledger.current_block_height();
        let merkle_root = match ledger.state_merkle_root(chained_height) {
            Ok(root) => root,
            Err(err) => {
                log::error!(
                    "chain store open: no state merkle root at height {}: {}",
                    chained_height,
                    err
                );
                return Err(ChainStoreError::Ledger(err));
            }
        };
        let mut chain_store = ChainStore {
            ledger,
            chained_height,
            pending_blocks: PendingBlocks::new(),
            event_publisher,
        };
        let block = chain_store.block(chained_height)?;
        chain_store.pending_blocks.insert(
            chained_height,
            PendingEntry {
                block,
                exec_result: ExecutionResult::settled_at(merkle_root),
                submitted: true,
            },
        );
        Ok(chain_store)
    }

    /// Release the store. Performs no durable action; teardown coordination belongs to the
    /// owning execution context (see [`Committer`](crate::committer::Committer)).
    pub fn close(self) {}
}

/// Admission and submission.
impl<L: Ledger> ChainStore<L> {
    /// Admit a block that consensus has declared final.
    ///
    /// In order:
    /// 1. Durably submit the current chained height (the one-block flush lag). A failure here
    ///    is logged, not propagated; the unflushed entry stays unsubmitted and the submission
    ///    is attempted again on the next admission or by a redundant
    ///    [`submit_block`](Self::submit_block) call.
    /// 2. Speculatively execute the new block. A failure here rejects this call: no pending
    ///    entry is created and the chained height does not advance. Retry policy is the
    ///    caller's responsibility.
    /// 3. Cache the execution record, notify the consensus engine, advance the chained height.
    ///
    /// A block at or below the chained height is a stale re-delivery: a warning is logged and
    /// the call succeeds without mutating anything. A block that skips past
    /// `chained height + 1` is rejected with [`ChainStoreError::HeightGap`] — admitting it
    /// would execute it at the wrong point in the chain.
    pub fn add_block(&mut self, block: Block) -> Result<(), ChainStoreError> {
        let height = block.height();
        if height <= self.chained_height {
            log::warn!(
                "chain store: stale re-delivery of block {} at chained height {}",
                height,
                self.chained_height
            );
            return Ok(());
        }
        if height != self.chained_height + 1 {
            return Err(ChainStoreError::HeightGap {
                height,
                chained: self.chained_height,
            });
        }

        if let Err(err) = self.submit_block(self.chained_height) {
            log::error!(
                "chain store: deferred submission of block {} failed: {}",
                self.chained_height,
                err
            );
        }

        let exec_result = self.ledger.execute_block(&block)?;

        let block_hash = block.hash();
        self.pending_blocks.insert(
            height,
            PendingEntry {
                block: block.clone(),
                exec_result,
                submitted: false,
            },
        );
        Event::InsertPending(InsertPendingEvent {
            timestamp: SystemTime::now(),
            height,
            block_hash,
        })
        .publish(&self.event_publisher);

        Event::ConsensusComplete(ConsensusCompleteEvent {
            timestamp: SystemTime::now(),
            block,
        })
        .publish(&self.event_publisher);

        self.chained_height = height;
        Ok(())
    }

    /// Durably submit the pending block at `height`, if there is one that has not been
    /// submitted yet. Idempotent and safe to call redundantly.
    ///
    /// On success the entry is marked submitted and the entry at `height - 1` is pruned: the
    /// entry two submissions old is no longer needed for root chaining or read queries.
    ///
    /// A ledger failure is returned only while `height` is still at or above the store's
    /// recorded progress, leaving the entry unsubmitted so a later call retries it. If the
    /// store has moved past `height` (via recovery), the failure is stale: it is logged,
    /// the entry is marked submitted anyway, and the call succeeds.
    pub fn submit_block(&mut self, height: BlockHeight) -> Result<(), ChainStoreError> {
        if height == BlockHeight::new(0) {
            return Ok(());
        }
        let block_hash = match self.pending_blocks.get(height) {
            Some(entry) if !entry.submitted => {
                if let Err(err) = self.ledger.submit_block(&entry.block, &entry.exec_result) {
                    if height >= self.chained_height {
                        return Err(ChainStoreError::Ledger(err));
                    }
                    log::warn!(
                        "chain store: ignoring stale submission failure for block {} at chained height {}: {}",
                        height,
                        self.chained_height,
                        err
                    );
                }
                entry.block.hash()
            }
            _ => return Ok(()),
        };

        self.pending_blocks.set_submitted(height);
        if self.pending_blocks.remove(height - 1) {
            Event::PruneEntry(PruneEntryEvent {
                timestamp: SystemTime::now(),
                height: height - 1,
            })
            .publish(&self.event_publisher);
        }
        Event::SubmitBlock(SubmitBlockEvent {
            timestamp: SystemTime::now(),
            height,
            block_hash,
        })
        .publish(&self.event_publisher);
        Ok(())
    }
}

/// Recovery.
impl<L: Ledger> ChainStore<L> {
    /// Adopt a ledger height that advanced independently of this store's admission path (e.g.,
    /// through state sync).
    ///
    /// If the ledger is ahead, the chained height jumps forward and every pending entry at or
    /// below the new height is dropped: their speculative results are superseded by the
    /// externally advanced durable state. Never decreases the chained height and never prunes
    /// an entry above the new height.
    pub fn reload_from_ledger(&mut self) {
        let durable_height = self.ledger.current_block_height();
        if durable_height > self.chained_height {
            let old_height = self.chained_height;
            self.chained_height = durable_height;
            self.pending_blocks.retain_above(durable_height);
            Event::ReloadChain(ReloadChainEvent {
                timestamp: SystemTime::now(),
                old_height,
                new_height: durable_height,
            })
            .publish(&self.event_publisher);
        }
    }
}

/// Getters.
impl<L: Ledger> ChainStore<L> {
    /// The highest height admitted by this store. Optimistic: the block at this height is not
    /// necessarily durable yet.
    pub fn chained_height(&self) -> BlockHeight {
        self.chained_height
    }

    /// The state merkle root after executing the block at `height`: the cached speculative
    /// root if `height` is pending, else the durable root from the ledger.
    pub fn exec_merkle_root(&self, height: BlockHeight) -> Result<CryptoHash, ChainStoreError> {
        if let Some(entry) = self.pending_blocks.get(height) {
            return Ok(entry.exec_result.merkle_root);
        }
        match self.ledger.state_merkle_root(height) {
            Ok(root) => Ok(root),
            Err(err) => {
                log::info!("chain store: no merkle root at height {}: {}", height, err);
                Err(ChainStoreError::Ledger(err))
            }
        }
    }

    /// The cached write-set of the block at `height`, or `None` if `height` is not pending.
    /// Committed state does not need an in-memory diff, so there is no durable fallback.
    pub fn exec_write_set(&self, height: BlockHeight) -> Option<&WriteSet> {
        self.pending_blocks
            .get(height)
            .map(|entry| &entry.exec_result.write_set)
    }

    /// The block at `height`: the cached block if pending, otherwise reconstructed from
    /// durable storage with the previous height's state root attached as cross-validation
    /// context.
    pub fn block(&self, height: BlockHeight) -> Result<Block, ChainStoreError> {
        if let Some(entry) = self.pending_blocks.get(height) {
            return Ok(entry.block.clone());
        }
        let mut block = self.ledger.block_by_height(height)?;
        if height > BlockHeight::new(1) {
            block.prev_exec_root = match self.ledger.state_merkle_root(height - 1) {
                Ok(root) => root,
                Err(err) => {
                    log::error!(
                        "chain store: no merkle root below block {}: {}",
                        height,
                        err
                    );
                    return Err(ChainStoreError::Ledger(err));
                }
            };
        }
        Ok(block)
    }
}

/// Errors that may be encountered when operating the [`ChainStore`].
#[derive(Debug)]
pub enum ChainStoreError {
    /// A ledger primitive failed beneath one of the store's operations.
    Ledger(LedgerError),

    /// A block was admitted whose height skips past the next expected height. This signals a
    /// broken admission-ordering contract upstream, not a condition the store can recover
    /// from by itself.
    HeightGap {
        height: BlockHeight,
        chained: BlockHeight,
    },
}

impl From<LedgerError> for ChainStoreError {
    fn from(value: LedgerError) -> Self {
        ChainStoreError::Ledger(value)
    }
}

impl std::fmt::Display for ChainStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainStoreError::Ledger(err) => write!(f, "ledger error: {}", err),
            ChainStoreError::HeightGap { height, chained } => write!(
                f,
                "block {} skips past the next expected height {}",
                height,
                *chained + 1
            ),
        }
    }
}
