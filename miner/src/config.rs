use serde::{Deserialize, Serialize};

use txpool::TxPoolConfig;
use types::pow_target;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinerConfig {
    /// A disabled config means the node carries no miner at all.
    pub enabled: bool,
    pub version: u32,
    /// Lock time stamped on coinbase transactions.
    pub default_lock_time: u32,
    pub pool: TxPoolConfig,
    /// Size budget for a mined block.
    pub block_size: u32,
    /// Highest nonce a search will try before giving up.
    pub nonce_limit: u32,
    /// Minting reward before any halving.
    pub initial_subsidy: u32,
    /// Halve the subsidy every this many blocks.
    pub halving_rate: u32,
    /// After this many halvings the subsidy is zero.
    pub max_halvings: u32,
    pub pow_target: String,
}

impl MinerConfig {
    pub fn new(pow_zeros: i32) -> Self {
        Self {
            enabled: true,
            version: 0,
            default_lock_time: 0,
            pool: TxPoolConfig::default(),
            block_size: 1000,
            nonce_limit: 1 << 20,
            initial_subsidy: 10,
            halving_rate: 10,
            max_halvings: 10,
            pow_target: pow_target(pow_zeros),
        }
    }

    pub fn disabled(pow_zeros: i32) -> Self {
        Self {
            enabled: false,
            ..Self::new(pow_zeros)
        }
    }

    /// Default settings with a single-entry pool, for capacity tests.
    pub fn small_pool(pow_zeros: i32) -> Self {
        let mut config = Self::new(pow_zeros);
        config.pool.capacity = 1;
        config
    }
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self::new(-1)
    }
}
