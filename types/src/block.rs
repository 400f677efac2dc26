use serde::{Deserialize, Serialize};
use tracing::debug;

use crypto::hash_hex;

use crate::tx::Transaction;
use crate::{STRING_FIELD_SIZE, U32_FIELD_SIZE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub prev_block_hash: String,
    pub merkle_root: String,
    pub timestamp: u32,
    pub difficulty_target: String,
    pub nonce: u32,
}

impl BlockHeader {
    /// Canonical printed form the block hash is computed over; all six
    /// fields participate.
    fn preimage(&self) -> String {
        format!(
            "{}/{}/{}/{}/{}/{}",
            self.version,
            self.prev_block_hash,
            self.merkle_root,
            self.timestamp,
            self.difficulty_target,
            self.nonce
        )
    }

    pub fn hash(&self) -> String {
        hash_hex(self.preimage().as_bytes())
    }

    pub fn size(&self) -> u32 {
        // The merkle root does not count toward the size estimate.
        2 * STRING_FIELD_SIZE + 3 * U32_FIELD_SIZE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Assemble an unsolved block: nonce starts at zero, the merkle root is
    /// derived from `transactions`.
    pub fn new(
        prev_block_hash: String,
        transactions: Vec<Transaction>,
        difficulty_target: String,
        timestamp: u32,
    ) -> Self {
        let merkle_root = merkle_root(&transactions);
        Self {
            header: BlockHeader {
                version: 0,
                prev_block_hash,
                merkle_root,
                timestamp,
                difficulty_target,
                nonce: 0,
            },
            transactions,
        }
    }

    pub fn hash(&self) -> String {
        self.header.hash()
    }

    /// Whether the block hash is strictly below `target`, comparing the
    /// decoded bytes lexicographically. Decode failures fail closed.
    pub fn satisfies_pow(&self, target: &str) -> bool {
        let hash = match hex::decode(self.hash()) {
            Ok(bytes) => bytes,
            Err(error) => {
                debug!(%error, "undecodable block hash");
                return false;
            }
        };
        let target = match hex::decode(target) {
            Ok(bytes) => bytes,
            Err(error) => {
                debug!(%error, "undecodable difficulty target");
                return false;
            }
        };
        hash < target
    }

    pub fn size(&self) -> u32 {
        let txs: u32 = self.transactions.iter().map(Transaction::size).sum();
        self.header.size() + txs
    }
}

/// Merkle root over the transaction hashes, hex-encoded. A lone leaf is its
/// own root. Odd levels duplicate their last entry; pairs are combined by
/// hashing the concatenation of their decoded bytes.
pub fn merkle_root(txs: &[Transaction]) -> String {
    let mut hashes: Vec<String> = txs.iter().map(Transaction::hash).collect();
    if hashes.is_empty() {
        return String::new();
    }
    if hashes.len() > 1 && hashes.len() % 2 != 0 {
        hashes.push(hashes[hashes.len() - 1].clone());
    }
    while hashes.len() > 1 {
        if hashes.len() % 2 != 0 {
            hashes.push(hashes[hashes.len() - 1].clone());
        }
        let mut next = Vec::with_capacity(hashes.len() / 2);
        for pair in hashes.chunks(2) {
            let mut bytes = hex::decode(&pair[0]).unwrap_or_default();
            bytes.extend(hex::decode(&pair[1]).unwrap_or_default());
            next.push(hash_hex(&bytes));
        }
        hashes = next;
    }
    hashes.remove(0)
}

/// Difficulty target with `leading_zeros` zeros, a single `1`, then zeros to
/// 64 hex characters. Out-of-range hardness clamps to 3.
pub fn pow_target(leading_zeros: i32) -> String {
    let position = if !(0..30).contains(&leading_zeros) {
        3
    } else {
        leading_zeros as usize
    };
    (0..64).map(|i| if i == position { '1' } else { '0' }).collect()
}
