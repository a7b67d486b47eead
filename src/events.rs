//! Definitions of commit-pipeline events for event handling and logging.
//!
//! An event for a given action indicates that the action has been completed. Events are
//! published into an optional unbounded channel; publishing never blocks, and delivery is
//! at-most-once with no acknowledgement.

use std::sync::mpsc::Sender;
use std::time::SystemTime;

use crate::types::{
    basic::{BlockHeight, CryptoHash},
    block::Block,
};

pub enum Event {
    // Events that change the pending cache.
    InsertPending(InsertPendingEvent),
    PruneEntry(PruneEntryEvent),
    // Events that change durable state.
    SubmitBlock(SubmitBlockEvent),
    ReloadChain(ReloadChainEvent),
    // The one-way notification toward the consensus engine.
    ConsensusComplete(ConsensusCompleteEvent),
}

impl Event {
    pub(crate) fn publish(self, event_publisher: &Option<Sender<Event>>) {
        if let Some(event_publisher) = event_publisher {
            // The receiving bus may already be gone during process shutdown.
            let _ = event_publisher.send(self);
        }
    }
}

/// A speculative execution record was cached for a newly admitted block.
pub struct InsertPendingEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub block_hash: CryptoHash,
}

/// A pending entry two submissions old was dropped from the cache.
pub struct PruneEntryEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
}

/// A pending block was durably submitted to the ledger.
pub struct SubmitBlockEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub block_hash: CryptoHash,
}

/// The chain store adopted a ledger height that advanced independently of admission.
pub struct ReloadChainEvent {
    pub timestamp: SystemTime,
    pub old_height: BlockHeight,
    pub new_height: BlockHeight,
}

/// A block reached consensus and was speculatively executed. This signals "agreed and
/// executed", not "durably stored".
pub struct ConsensusCompleteEvent {
    pub timestamp: SystemTime,
    pub block: Block,
}
