use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// A disabled config means the node carries no wallet.
    pub enabled: bool,
    /// Safe blocks an unconfirmed transaction may age before it is resent.
    pub replay_threshold: u32,
    /// How deep a block must sit before the wallet treats it as confirmed.
    pub safe_block_amount: u32,
    pub tx_version: u32,
    pub default_lock_time: u32,
}

impl WalletConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            replay_threshold: 0,
            safe_block_amount: 0,
            tx_version: 0,
            default_lock_time: 0,
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            replay_threshold: 3,
            safe_block_amount: 5,
            tx_version: 0,
            default_lock_time: 0,
        }
    }
}
