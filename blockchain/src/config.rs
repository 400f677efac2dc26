use serde::{Deserialize, Serialize};

/// Public key the genesis transaction pays out to, as the hex of its
/// PKIX-encoded form.
pub const GENESIS_PUB_KEY: &str = "3059301306072a8648ce3d020106082a8648ce3d030107034200042418a20458559ae13a0d4bb6ac284c66a5cebb5689563d4cf573473d8c6d5abfa9a21a65dbb3ba2f2d930be7f763f940f9864abaf199a0f0d8d14bedda2dcad9";

/// Matching secret key, kept so a designated node (and the tests) can spend
/// the genesis output.
pub const GENESIS_SECRET_KEY: &str = "307702010104202456b0e8bed5c27dcadb044df1af8eaf714084b61a23d17359fb09f3c3f5fff5a00a06082a8648ce3d030107a144034200042418a20458559ae13a0d4bb6ac284c66a5cebb5689563d4cf573473d8c6d5abfa9a21a65dbb3ba2f2d930be7f763f940f9864abaf199a0f0d8d14bedda2dcad9";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Amount the genesis transaction mints.
    pub initial_subsidy: u32,
    pub genesis_pub_key: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            initial_subsidy: 100_000,
            genesis_pub_key: GENESIS_PUB_KEY.to_string(),
        }
    }
}
