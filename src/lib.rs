//! A speculative block-commit pipeline for blockchain full nodes.
//!
//! This crate implements the component that sits between "consensus declared block N final" and
//! "block N is durably stored with a proven state root". The [chain store](crate::chain_store)
//! speculatively executes agreed blocks, caches their results in a pending-block cache, and
//! flushes them to the durable [ledger](crate::ledger) one block behind agreement, so that
//! agreement latency and storage-commit latency overlap instead of serializing.
//!
//! The BFT voting protocol, peer-to-peer transport, and RPC surfaces are external
//! collaborators: consensus feeds agreed blocks in (directly, or through the
//! [committer](crate::committer) mailbox) and receives
//! [completion notifications](crate::events::ConsensusCompleteEvent) back; the ledger is any
//! implementation of the [`Ledger`](crate::ledger::Ledger) trait.

pub mod types;

pub mod ledger;

pub mod chain_store;

pub mod events;

pub mod committer;

pub mod logging;

pub(crate) mod event_bus;
