//! The thread that distributes published [events](crate::events) to registered handlers.

use std::sync::mpsc::Receiver;
use std::sync::mpsc::TryRecvError;
use std::thread;
use std::thread::JoinHandle;

use crate::events::*;
use crate::logging::Logger;

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send>;

pub(crate) struct EventHandlers {
    pub(crate) insert_pending_handlers: Vec<HandlerPtr<InsertPendingEvent>>,
    pub(crate) prune_entry_handlers: Vec<HandlerPtr<PruneEntryEvent>>,
    pub(crate) submit_block_handlers: Vec<HandlerPtr<SubmitBlockEvent>>,
    pub(crate) reload_chain_handlers: Vec<HandlerPtr<ReloadChainEvent>>,
    pub(crate) consensus_complete_handlers: Vec<HandlerPtr<ConsensusCompleteEvent>>,
}

impl EventHandlers {
    /// Collect the default logging handlers (if `log_events`) and the user-registered handlers
    /// into one registry.
    pub(crate) fn new(
        log_events: bool,
        on_insert_pending: Option<HandlerPtr<InsertPendingEvent>>,
        on_prune_entry: Option<HandlerPtr<PruneEntryEvent>>,
        on_submit_block: Option<HandlerPtr<SubmitBlockEvent>>,
        on_reload_chain: Option<HandlerPtr<ReloadChainEvent>>,
        on_consensus_complete: Option<HandlerPtr<ConsensusCompleteEvent>>,
    ) -> EventHandlers {
        let mut insert_pending_handlers = Vec::new();
        let mut prune_entry_handlers = Vec::new();
        let mut submit_block_handlers = Vec::new();
        let mut reload_chain_handlers = Vec::new();
        let mut consensus_complete_handlers = Vec::new();

        if log_events {
            insert_pending_handlers.push(InsertPendingEvent::get_logger());
            prune_entry_handlers.push(PruneEntryEvent::get_logger());
            submit_block_handlers.push(SubmitBlockEvent::get_logger());
            reload_chain_handlers.push(ReloadChainEvent::get_logger());
            consensus_complete_handlers.push(ConsensusCompleteEvent::get_logger());
        }

        insert_pending_handlers.extend(on_insert_pending);
        prune_entry_handlers.extend(on_prune_entry);
        submit_block_handlers.extend(on_submit_block);
        reload_chain_handlers.extend(on_reload_chain);
        consensus_complete_handlers.extend(on_consensus_complete);

        EventHandlers {
            insert_pending_handlers,
            prune_entry_handlers,
            submit_block_handlers,
            reload_chain_handlers,
            consensus_complete_handlers,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.insert_pending_handlers.is_empty()
            && self.prune_entry_handlers.is_empty()
            && self.submit_block_handlers.is_empty()
            && self.reload_chain_handlers.is_empty()
            && self.consensus_complete_handlers.is_empty()
    }

    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::InsertPending(insert_pending_event) => self
                .insert_pending_handlers
                .iter()
                .for_each(|handler| handler(&insert_pending_event)),

            Event::PruneEntry(prune_entry_event) => self
                .prune_entry_handlers
                .iter()
                .for_each(|handler| handler(&prune_entry_event)),

            Event::SubmitBlock(submit_block_event) => self
                .submit_block_handlers
                .iter()
                .for_each(|handler| handler(&submit_block_event)),

            Event::ReloadChain(reload_chain_event) => self
                .reload_chain_handlers
                .iter()
                .for_each(|handler| handler(&reload_chain_event)),

            Event::ConsensusComplete(consensus_complete_event) => self
                .consensus_complete_handlers
                .iter()
                .for_each(|handler| handler(&consensus_complete_event)),
        }
    }
}

pub(crate) fn start_event_bus(
    event_handlers: EventHandlers,
    event_subscriber: Receiver<Event>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) => return,
            Err(TryRecvError::Empty) => (),
            Err(TryRecvError::Disconnected) => {
                panic!("event_bus thread disconnected from main thread")
            }
        }

        match event_subscriber.try_recv() {
            Ok(event) => event_handlers.fire_handlers(event),
            // The committer thread (the event publisher) is shut down before the bus; its
            // hangup only means no further events are coming.
            Err(TryRecvError::Disconnected) | Err(TryRecvError::Empty) => (),
        }
    })
}
