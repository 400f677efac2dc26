mod config;
mod worker;

pub use config::MinerConfig;
pub use worker::{Miner, MinerSignal};
