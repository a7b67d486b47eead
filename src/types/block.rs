//! Definitions for the 'block' type and its associated methods.

use borsh::{BorshDeserialize, BorshSerialize};
pub use sha2::Sha256 as CryptoHasher;
use sha2::Digest;

use crate::types::basic::{BlockHeight, CryptoHash};

/// The fixed-size part of a block. The header alone determines the block's hash.
#[derive(Clone, BorshSerialize, BorshDeserialize)]
pub struct BlockHeader {
    pub height: BlockHeight,
    pub prev_block_hash: CryptoHash,
    pub txs_root: CryptoHash,
    pub timestamp: u64,
}

/// A single transaction. The payload is opaque to the commit pipeline; only the ledger's
/// execution primitive interprets it.
#[derive(Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Transaction(Vec<u8>);

impl Transaction {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> &Vec<u8> {
        &self.0
    }
}

/// An agreed block: a header, an ordered transaction list, and the merkle root of the world
/// state at the *previous* height.
///
/// `prev_exec_root` is cross-validation context rather than part of the hashed content.
/// Consensus-produced blocks carry it inline; durable storage does not, so
/// [`ChainStore::block`](crate::chain_store::ChainStore::block) re-attaches it when
/// reconstructing a block from the ledger.
#[derive(Clone, BorshSerialize, BorshDeserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    pub prev_exec_root: CryptoHash,
}

impl Block {
    pub fn new(
        header: BlockHeader,
        transactions: Vec<Transaction>,
        prev_exec_root: CryptoHash,
    ) -> Block {
        Block {
            header,
            transactions,
            prev_exec_root,
        }
    }

    pub fn height(&self) -> BlockHeight {
        self.header.height
    }

    pub fn hash(&self) -> CryptoHash {
        let mut hasher = CryptoHasher::new();
        hasher.update(&self.header.try_to_vec().unwrap());
        CryptoHash::new(hasher.finalize().into())
    }
}
