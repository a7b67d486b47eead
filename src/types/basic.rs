//! "Inert" types of the block-commit pipeline, i.e., those that are passed around and inspected,
//! but have no active behavior. These types follow the newtype pattern and the API for using them
//! is defined in this module.

use borsh::{BorshDeserialize, BorshSerialize};
use std::{
    collections::{hash_map, hash_set, HashMap, HashSet},
    fmt::{self, Debug, Display, Formatter},
    ops::{Add, AddAssign, Sub},
};

/// Height of a block in the blockchain. The genesis block sits at height 0.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct BlockHeight(u32);

impl BlockHeight {
    pub const fn new(int: u32) -> Self {
        Self(int)
    }

    pub const fn int(&self) -> u32 {
        self.0
    }

    pub fn to_le_bytes(&self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl Display for BlockHeight {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl Add<u32> for BlockHeight {
    type Output = BlockHeight;

    fn add(self, rhs: u32) -> Self::Output {
        BlockHeight::new(self.0.add(rhs))
    }
}

impl AddAssign<u32> for BlockHeight {
    fn add_assign(&mut self, rhs: u32) {
        self.0.add_assign(rhs)
    }
}

impl Sub<u32> for BlockHeight {
    type Output = BlockHeight;

    fn sub(self, rhs: u32) -> Self::Output {
        BlockHeight::new(self.0.sub(rhs))
    }
}

/// A 256-bit digest: the hash of a block, or the merkle root of the world state after executing
/// a block.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct CryptoHash([u8; 32]);

impl CryptoHash {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }

    /// The all-zeroes digest, used where no predecessor root exists.
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }
}

impl Display for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Debug for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The key-value state diff produced by executing one block: a set of insertions and a set of
/// deletions. Inserting a key removes it from the deletions, and vice versa, so a `WriteSet`
/// records at most one effect per key.
#[derive(Clone, Default, BorshSerialize, BorshDeserialize)]
pub struct WriteSet {
    inserts: HashMap<Vec<u8>, Vec<u8>>,
    deletes: HashSet<Vec<u8>>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self {
            inserts: HashMap::new(),
            deletes: HashSet::new(),
        }
    }

    pub fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.deletes.remove(&key);
        self.inserts.insert(key, value);
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.inserts.remove(&key);
        self.deletes.insert(key);
    }

    pub fn get_insert(&self, key: &[u8]) -> Option<&Vec<u8>> {
        self.inserts.get(key)
    }

    pub fn contains_delete(&self, key: &[u8]) -> bool {
        self.deletes.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.deletes.is_empty()
    }

    /// Get an iterator over all of the key-value pairs inserted by this `WriteSet`.
    pub fn inserts(&self) -> hash_map::Iter<Vec<u8>, Vec<u8>> {
        self.inserts.iter()
    }

    /// Get an iterator over all of the keys deleted by this `WriteSet`.
    pub fn deletions(&self) -> hash_set::Iter<Vec<u8>> {
        self.deletes.iter()
    }
}
