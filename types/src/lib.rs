pub mod block;
pub mod network;
pub mod tx;

pub use block::{merkle_root, pow_target, Block, BlockHeader};
pub use tx::{utxo_key, Transaction, TransactionInput, TransactionOutput};

/// Widths of the fixed-field size model. Sizes are accounting estimates
/// shared by every node, not serialized byte counts; priority and block
/// packing depend on them staying put.
pub(crate) const STRING_FIELD_SIZE: u32 = 16;
pub(crate) const U32_FIELD_SIZE: u32 = 4;
