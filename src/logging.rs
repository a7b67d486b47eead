//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the committer's
//! [spec](crate::committer::CommitterSpec).
//!
//! This crate logs using the [log](https://docs.rs/log/latest/log/) crate. To get these
//! messages printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two
//! values are always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as
//!    constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following
//! snippet is how a [SubmitBlock](crate::events::SubmitBlockEvent) is printed:
//!
//! ```text
//! SubmitBlock, 1701329264, 42, fNGCJyk
//! ```
//!
//! In the snippet:
//! - The third value is the height of the submitted block.
//! - The fourth value is the first seven characters of the Base64 encoding of the hash of the
//!   submitted block.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use std::time::SystemTime;

use crate::events::*;

// Names of each event in PascalCase for printing:
pub const INSERT_PENDING: &str = "InsertPending";
pub const PRUNE_ENTRY: &str = "PruneEntry";
pub const SUBMIT_BLOCK: &str = "SubmitBlock";
pub const RELOAD_CHAIN: &str = "ReloadChain";
pub const CONSENSUS_COMPLETE: &str = "ConsensusComplete";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for InsertPendingEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |insert_pending_event: &InsertPendingEvent| {
            log::info!(
                "{}, {}, {}, {}",
                INSERT_PENDING,
                secs_since_unix_epoch(insert_pending_event.timestamp),
                insert_pending_event.height,
                first_seven_base64_chars(&insert_pending_event.block_hash.bytes()),
            )
        };
        Box::new(logger)
    }
}

impl Logger for PruneEntryEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |prune_entry_event: &PruneEntryEvent| {
            log::info!(
                "{}, {}, {}",
                PRUNE_ENTRY,
                secs_since_unix_epoch(prune_entry_event.timestamp),
                prune_entry_event.height,
            )
        };
        Box::new(logger)
    }
}

impl Logger for SubmitBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |submit_block_event: &SubmitBlockEvent| {
            log::info!(
                "{}, {}, {}, {}",
                SUBMIT_BLOCK,
                secs_since_unix_epoch(submit_block_event.timestamp),
                submit_block_event.height,
                first_seven_base64_chars(&submit_block_event.block_hash.bytes()),
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReloadChainEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |reload_chain_event: &ReloadChainEvent| {
            log::info!(
                "{}, {}, {}, {}",
                RELOAD_CHAIN,
                secs_since_unix_epoch(reload_chain_event.timestamp),
                reload_chain_event.old_height,
                reload_chain_event.new_height,
            )
        };
        Box::new(logger)
    }
}

impl Logger for ConsensusCompleteEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |consensus_complete_event: &ConsensusCompleteEvent| {
            log::info!(
                "{}, {}, {}, {}",
                CONSENSUS_COMPLETE,
                secs_since_unix_epoch(consensus_complete_event.timestamp),
                consensus_complete_event.block.height(),
                first_seven_base64_chars(&consensus_complete_event.block.hash().bytes()),
            )
        };
        Box::new(logger)
    }
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the
// first 7 characters.
fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .expect("Event occured before the Unix Epoch.")
        .as_secs()
}
