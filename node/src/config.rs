use std::time::Duration;

use serde::{Deserialize, Serialize};

use blockchain::ChainConfig;
use miner::MinerConfig;
use wallet::WalletConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Software version; handshakes from other versions are rejected.
    pub version: u32,
    pub peer_limit: usize,
    pub addr_limit: usize,
    pub host: String,
    /// Port to listen on; 0 lets the OS pick one.
    pub port: u16,
    /// Window in which a reciprocal handshake is considered already answered.
    pub version_timeout: Duration,
    pub max_block_size: u32,
    pub chain: ChainConfig,
    pub miner: MinerConfig,
    pub wallet: WalletConfig,
}

impl NodeConfig {
    pub fn new(port: u16) -> Self {
        Self {
            version: 0,
            peer_limit: 20,
            addr_limit: 1000,
            host: "127.0.0.1".to_string(),
            port,
            version_timeout: Duration::from_secs(2),
            max_block_size: 10_000_000,
            chain: ChainConfig::default(),
            miner: MinerConfig::default(),
            wallet: WalletConfig::default(),
        }
    }

    /// An RPC server and nothing else: no miner, no wallet.
    pub fn nil(port: u16) -> Self {
        Self {
            miner: MinerConfig::disabled(-1),
            wallet: WalletConfig::disabled(),
            ..Self::new(port)
        }
    }

    /// Default settings minus the miner.
    pub fn without_miner(port: u16) -> Self {
        Self {
            miner: MinerConfig::disabled(-1),
            ..Self::new(port)
        }
    }

    /// Default settings with a single-transaction pool.
    pub fn small_pool(port: u16) -> Self {
        Self {
            miner: MinerConfig::small_pool(-1),
            ..Self::new(port)
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::new(0)
    }
}
