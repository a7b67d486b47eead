//! Methods to build and run a committer: the single writer thread that drives a
//! [`ChainStore`](crate::chain_store::ChainStore).
//!
//! The chain store's mutating methods must be invoked sequentially by exactly one logical
//! execution context. This module provides that context as an actor mailbox: the consensus
//! engine sends [`ChainMessage`]s into a channel, and a dedicated committer thread drains the
//! channel and applies each message to the store in order. Completion notifications flow back
//! out through the [event bus](crate::events) — at-most-once, no acknowledgement, and the
//! committer never blocks on their delivery.
//!
//! Read access is not provided through the mailbox. A component that needs the read accessors
//! should either drive a `ChainStore` directly from a single context of its own, or route its
//! queries through the consensus engine's context.
//!
//! ## Starting a committer
//!
//! Here is an example that demonstrates how to build and start a committer using the builder
//! pattern:
//!
//! ```ignore
//! let (committer, mailbox) =
//!     CommitterSpec::builder()
//!     .ledger(ledger)
//!     .log_events(true)
//!     .on_consensus_complete(|event| { ... })
//!     .build()
//!     .start()?;
//!
//! mailbox.send(ChainMessage::AddBlock(block)).unwrap();
//! ```
//!
//! ### Required setters
//!
//! - `.ledger(...)`
//! - `.log_events(...)`
//!
//! ### Optional setters
//!
//! The optional setters register handlers for the events in [crate::events]:
//! - `.on_insert_pending(...)`
//! - `.on_prune_entry(...)`
//! - `.on_submit_block(...)`
//! - `.on_reload_chain(...)`
//! - `.on_consensus_complete(...)`

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use typed_builder::TypedBuilder;

use crate::chain_store::{ChainStore, ChainStoreError};
use crate::event_bus::*;
use crate::events::*;
use crate::ledger::Ledger;
use crate::types::block::Block;

/// How long the committer thread waits on its mailbox before re-checking the shutdown signal.
const MAILBOX_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Instructions the consensus engine sends into the committer's mailbox.
pub enum ChainMessage {
    /// Admit a block that consensus has declared final.
    AddBlock(Block),

    /// The ledger's durable height may have advanced independently (e.g., state sync
    /// completed); adopt it.
    ReloadFromLedger,
}

/// Stores all necessary parameters and trait implementations required to run a committer.
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [CommitterSpec]. On the builder call the following methods to construct a valid [CommitterSpec].

    Required:
    - `.ledger(...)`
    - `.log_events(...)`

    Optional:
    - `.on_insert_pending(...)`
    - `.on_prune_entry(...)`
    - `.on_submit_block(...)`
    - `.on_reload_chain(...)`
    - `.on_consensus_complete(...)`
"))]
pub struct CommitterSpec<L: Ledger> {
    // Required parameters
    #[builder(setter(doc = "Set the durable ledger beneath the chain store. The argument must implement the [Ledger](crate::ledger::Ledger) trait. Required."))]
    ledger: L,
    #[builder(setter(doc = "Enable logging? Required."))]
    log_events: bool,
    // Optional parameters
    #[builder(default, setter(transform = |handler: impl Fn(&InsertPendingEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<InsertPendingEvent>),
    doc = "Register a handler closure to be invoked after a speculative execution record is cached. Optional."))]
    on_insert_pending: Option<HandlerPtr<InsertPendingEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&PruneEntryEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<PruneEntryEvent>),
    doc = "Register a handler closure to be invoked after a pending entry is pruned. Optional."))]
    on_prune_entry: Option<HandlerPtr<PruneEntryEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&SubmitBlockEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<SubmitBlockEvent>),
    doc = "Register a handler closure to be invoked after a block is durably submitted. Optional."))]
    on_submit_block: Option<HandlerPtr<SubmitBlockEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReloadChainEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReloadChainEvent>),
    doc = "Register a handler closure to be invoked after the store adopts an externally advanced ledger height. Optional."))]
    on_reload_chain: Option<HandlerPtr<ReloadChainEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ConsensusCompleteEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ConsensusCompleteEvent>),
    doc = "Register a handler closure to be invoked after a block is agreed and speculatively executed. This is the notification the consensus engine subscribes to. Optional."))]
    on_consensus_complete: Option<HandlerPtr<ConsensusCompleteEvent>>,
}

impl<L: Ledger> CommitterSpec<L> {
    /// Open the chain store and start the committer and event bus threads. Returns the handle
    /// keeping the threads alive, and the sending end of the committer's mailbox.
    ///
    /// Fails if the chain store cannot establish its baseline from the ledger.
    pub fn start(self) -> Result<(Committer, Sender<ChainMessage>), ChainStoreError> {
        let event_handlers = EventHandlers::new(
            self.log_events,
            self.on_insert_pending,
            self.on_prune_entry,
            self.on_submit_block,
            self.on_reload_chain,
            self.on_consensus_complete,
        );

        let (event_publisher, event_subscriber) = if !event_handlers.is_empty() {
            Some(mpsc::channel()).unzip()
        } else {
            (None, None)
        };

        let chain_store = ChainStore::open(self.ledger, event_publisher)?;

        let (mailbox_sender, mailbox) = mpsc::channel();
        let (committer_shutdown, committer_shutdown_receiver) = mpsc::channel();
        let committer_thread = start_committer(chain_store, mailbox, committer_shutdown_receiver);

        let (event_bus_shutdown, event_bus_shutdown_receiver) = if !event_handlers.is_empty() {
            Some(mpsc::channel()).unzip()
        } else {
            (None, None)
        };

        let event_bus = if !event_handlers.is_empty() {
            Some(start_event_bus(
                event_handlers,
                event_subscriber.unwrap(), // Safety: should be Some(...).
                event_bus_shutdown_receiver.unwrap(), // Safety: should be Some(...).
            ))
        } else {
            None
        };

        let committer = Committer {
            committer: Some(committer_thread),
            committer_shutdown,
            event_bus,
            event_bus_shutdown,
        };

        Ok((committer, mailbox_sender))
    }
}

fn start_committer<L: Ledger>(
    mut chain_store: ChainStore<L>,
    mailbox: Receiver<ChainMessage>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) => return,
            Err(TryRecvError::Empty) => (),
            Err(TryRecvError::Disconnected) => {
                panic!("Committer thread disconnected from main thread")
            }
        }

        match mailbox.recv_timeout(MAILBOX_POLL_INTERVAL) {
            Ok(ChainMessage::AddBlock(block)) => {
                let height = block.height();
                match chain_store.add_block(block) {
                    Ok(()) => (),
                    Err(err @ ChainStoreError::HeightGap { .. }) => {
                        // An out-of-order delivery breaks the admission contract; continuing
                        // would execute blocks at the wrong point in the chain.
                        panic!("Programming error: {}", err)
                    }
                    Err(err) => {
                        log::error!("committer: dropping block {}: {}", height, err)
                    }
                }
            }
            Ok(ChainMessage::ReloadFromLedger) => chain_store.reload_from_ledger(),
            Err(RecvTimeoutError::Timeout) => (),
            // The consensus side hung up; keep serving the shutdown signal.
            Err(RecvTimeoutError::Disconnected) => (),
        }
    })
}

/// A handle to the background threads of a running committer. When this value is dropped, all
/// background threads are gracefully shut down.
pub struct Committer {
    committer: Option<JoinHandle<()>>,
    committer_shutdown: Sender<()>,
    event_bus: Option<JoinHandle<()>>,
    event_bus_shutdown: Option<Sender<()>>,
}

impl Drop for Committer {
    fn drop(&mut self) {
        // Safety: the committer thread publishes into the event bus, so it is stopped first;
        // the bus drains whatever was buffered before its own shutdown signal is delivered.
        self.committer_shutdown.send(()).unwrap();
        self.committer.take().unwrap().join().unwrap();

        self.event_bus_shutdown
            .iter()
            .for_each(|shutdown| shutdown.send(()).unwrap());
        if self.event_bus.is_some() {
            self.event_bus.take().unwrap().join().unwrap();
        }
    }
}
