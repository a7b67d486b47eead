//! [`MemLedger`], a simple, volatile, in-memory implementation of [`Ledger`] used in all of the
//! integration tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use sha2::{Digest, Sha256};

use chain_store_rs::{
    ledger::{Ledger, LedgerError},
    types::{
        basic::{BlockHeight, CryptoHash, WriteSet},
        block::{Block, BlockHeader, Transaction},
        execution::ExecutionResult,
    },
};

/// An in-memory implementation of [`Ledger`].
///
/// Execution is modeled deterministically: the state root after a block is
/// `Sha256(parent root || block hash)` (see [`chain_root`]), and a block's write-set inserts
/// one key per transaction, mapping the transaction payload to the block's hash. This keeps
/// root chains recomputable from the outside, which the tests use to check root continuity.
///
/// The ledger records every submission attempt per height, and failures can be injected into
/// the next `execute_block` or `submit_block` call, or into all `state_merkle_root` lookups.
#[derive(Clone)]
pub(crate) struct MemLedger(Arc<Mutex<MemLedgerInner>>);

struct MemLedgerInner {
    // blocks[h] is the durable block at height h; the genesis block sits at index 0.
    blocks: Vec<Block>,
    // roots[h] is the durable state merkle root at height h.
    roots: Vec<CryptoHash>,
    state: HashMap<Vec<u8>, Vec<u8>>,
    // Roots produced by execute_block for heights that are not yet durable.
    exec_roots: HashMap<u32, CryptoHash>,
    submit_attempts: HashMap<u32, u32>,
    fail_next_execute: bool,
    fail_next_submit: bool,
    fail_root_lookups: bool,
}

impl MemLedger {
    /// Create a `MemLedger` holding only the genesis block.
    pub(crate) fn new() -> MemLedger {
        let genesis = Block::new(
            BlockHeader {
                height: BlockHeight::new(0),
                prev_block_hash: CryptoHash::zero(),
                txs_root: CryptoHash::zero(),
                timestamp: 0,
            },
            Vec::new(),
            CryptoHash::zero(),
        );
        let genesis_root = {
            let mut hasher = Sha256::new();
            hasher.update(b"genesis");
            CryptoHash::new(hasher.finalize().into())
        };
        MemLedger(Arc::new(Mutex::new(MemLedgerInner {
            blocks: vec![genesis],
            roots: vec![genesis_root],
            state: HashMap::new(),
            exec_roots: HashMap::new(),
            submit_attempts: HashMap::new(),
            fail_next_execute: false,
            fail_next_submit: false,
            fail_root_lookups: false,
        })))
    }

    /// Create a `MemLedger` with a durable chain extending up to `height`.
    pub(crate) fn with_height(height: u32) -> MemLedger {
        let ledger = MemLedger::new();
        ledger.0.lock().unwrap().extend_durably(height);
        ledger
    }

    /// Grow the durable chain to `height` outside the submission path, as a completed state
    /// sync would.
    pub(crate) fn externally_advance_to(&self, height: u32) {
        let mut inner = self.0.lock().unwrap();
        inner.extend_durably(height);
        let durable = (inner.blocks.len() - 1) as u32;
        inner.exec_roots.retain(|h, _| *h > durable);
    }

    pub(crate) fn durable_height(&self) -> u32 {
        (self.0.lock().unwrap().blocks.len() - 1) as u32
    }

    pub(crate) fn durable_root(&self, height: u32) -> CryptoHash {
        self.0.lock().unwrap().roots[height as usize]
    }

    pub(crate) fn durable_block(&self, height: u32) -> Block {
        self.0.lock().unwrap().blocks[height as usize].clone()
    }

    /// How many times `submit_block` has been called for `height`, including failed calls.
    pub(crate) fn submit_attempts(&self, height: u32) -> u32 {
        *self
            .0
            .lock()
            .unwrap()
            .submit_attempts
            .get(&height)
            .unwrap_or(&0)
    }

    pub(crate) fn state_value(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.0.lock().unwrap().state.get(key).cloned()
    }

    pub(crate) fn fail_next_execute(&self) {
        self.0.lock().unwrap().fail_next_execute = true;
    }

    pub(crate) fn fail_next_submit(&self) {
        self.0.lock().unwrap().fail_next_submit = true;
    }

    pub(crate) fn fail_root_lookups(&self, fail: bool) {
        self.0.lock().unwrap().fail_root_lookups = fail;
    }
}

impl MemLedgerInner {
    // Append generated blocks up to `height`, applying their effects durably.
    fn extend_durably(&mut self, height: u32) {
        while (self.blocks.len() - 1) < height as usize {
            let parent = self.blocks.last().unwrap();
            let parent_root = *self.roots.last().unwrap();
            let next_height = parent.height() + 1;
            let block = child_block(
                parent,
                parent_root,
                vec![Transaction::new(
                    format!("generated-{}", next_height).into_bytes(),
                )],
            );
            let root = chain_root(&parent_root, &block.hash());
            for tx in &block.transactions {
                self.state
                    .insert(tx.bytes().clone(), block.hash().bytes().to_vec());
            }
            self.blocks.push(stored_form(&block));
            self.roots.push(root);
        }
    }
}

impl Ledger for MemLedger {
    fn current_block_height(&self) -> BlockHeight {
        BlockHeight::new((self.0.lock().unwrap().blocks.len() - 1) as u32)
    }

    fn state_merkle_root(&self, height: BlockHeight) -> Result<CryptoHash, LedgerError> {
        let inner = self.0.lock().unwrap();
        if inner.fail_root_lookups {
            return Err(LedgerError::RootNotFound { height });
        }
        inner
            .roots
            .get(height.int() as usize)
            .copied()
            .ok_or(LedgerError::RootNotFound { height })
    }

    fn execute_block(&self, block: &Block) -> Result<ExecutionResult, LedgerError> {
        let mut inner = self.0.lock().unwrap();
        let height = block.height();
        if inner.fail_next_execute {
            inner.fail_next_execute = false;
            return Err(LedgerError::ExecuteFailed {
                height,
                reason: "injected failure".to_string(),
            });
        }
        if height.int() == 0 {
            return Err(LedgerError::ExecuteFailed {
                height,
                reason: "the genesis block is not executable".to_string(),
            });
        }
        let parent_height = height.int() - 1;
        let parent_root = match inner.exec_roots.get(&parent_height) {
            Some(root) => *root,
            None => *inner.roots.get(parent_height as usize).ok_or_else(|| {
                LedgerError::ExecuteFailed {
                    height,
                    reason: "no parent state".to_string(),
                }
            })?,
        };
        let root = chain_root(&parent_root, &block.hash());
        let mut write_set = WriteSet::new();
        for tx in &block.transactions {
            write_set.insert(tx.bytes().clone(), block.hash().bytes().to_vec());
        }
        inner.exec_roots.insert(height.int(), root);
        Ok(ExecutionResult {
            write_set,
            merkle_root: root,
        })
    }

    fn submit_block(
        &mut self,
        block: &Block,
        exec_result: &ExecutionResult,
    ) -> Result<(), LedgerError> {
        let mut inner = self.0.lock().unwrap();
        let height = block.height();
        *inner.submit_attempts.entry(height.int()).or_insert(0) += 1;
        if inner.fail_next_submit {
            inner.fail_next_submit = false;
            return Err(LedgerError::SubmitFailed {
                height,
                reason: "injected failure".to_string(),
            });
        }
        let durable = (inner.blocks.len() - 1) as u32;
        if height.int() <= durable {
            return Ok(());
        }
        if height.int() != durable + 1 {
            return Err(LedgerError::SubmitFailed {
                height,
                reason: "not the next durable height".to_string(),
            });
        }
        for (key, value) in exec_result.write_set.inserts() {
            inner.state.insert(key.clone(), value.clone());
        }
        for key in exec_result.write_set.deletions() {
            inner.state.remove(key);
        }
        inner.blocks.push(stored_form(block));
        inner.roots.push(exec_result.merkle_root);
        inner.exec_roots.remove(&height.int());
        Ok(())
    }

    fn block_by_height(&self, height: BlockHeight) -> Result<Block, LedgerError> {
        self.0
            .lock()
            .unwrap()
            .blocks
            .get(height.int() as usize)
            .cloned()
            .ok_or(LedgerError::BlockNotFound { height })
    }
}

/// The deterministic root chaining rule of `MemLedger`: the state root after a block is the
/// digest of the parent root followed by the block's hash.
pub(crate) fn chain_root(parent_root: &CryptoHash, block_hash: &CryptoHash) -> CryptoHash {
    let mut hasher = Sha256::new();
    hasher.update(parent_root.bytes());
    hasher.update(block_hash.bytes());
    CryptoHash::new(hasher.finalize().into())
}

/// Build the block that extends `parent`, carrying the parent's state root as cross-validation
/// context.
pub(crate) fn child_block(
    parent: &Block,
    parent_root: CryptoHash,
    transactions: Vec<Transaction>,
) -> Block {
    let txs_root = {
        let mut hasher = Sha256::new();
        for tx in &transactions {
            hasher.update(tx.bytes());
        }
        CryptoHash::new(hasher.finalize().into())
    };
    Block::new(
        BlockHeader {
            height: parent.height() + 1,
            prev_block_hash: parent.hash(),
            txs_root,
            timestamp: parent.header.timestamp + 1,
        },
        transactions,
        parent_root,
    )
}

// Durable storage does not inline the previous height's state root.
fn stored_form(block: &Block) -> Block {
    let mut stored = block.clone();
    stored.prev_exec_root = CryptoHash::zero();
    stored
}
