mod config;
mod liminal;

pub use config::WalletConfig;
pub use liminal::LiminalQueue;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use blockchain::Blockchain;
use crypto::Keypair;
use types::tx::{Transaction, TransactionInput, TransactionOutput};
use types::Block;

/// The minimum a caller must supply to pay someone.
#[derive(Debug, Clone)]
pub struct TxRequest {
    /// Recipient locking script: hex of their PKIX-encoded public key.
    pub to_pub_key: String,
    pub amount: u32,
    /// Extra paid to whichever miner confirms the transaction.
    pub fee: u32,
}

/// Turns transaction requests into signed transactions and keeps the unsent
/// ones honest: anything not confirmed in time is replayed with a bumped
/// lock time.
pub struct Wallet {
    config: WalletConfig,
    keypair: Arc<Keypair>,
    chain: Arc<Blockchain>,
    to_node: mpsc::Sender<Transaction>,
    liminal: LiminalQueue,
}

impl Wallet {
    /// A disabled config produces no wallet.
    pub fn new(
        config: WalletConfig,
        keypair: Arc<Keypair>,
        chain: Arc<Blockchain>,
        to_node: mpsc::Sender<Transaction>,
    ) -> Option<Arc<Self>> {
        if !config.enabled {
            return None;
        }
        let liminal = LiminalQueue::new(config.replay_threshold);
        Some(Arc::new(Self {
            config,
            keypair,
            chain,
            to_node,
            liminal,
        }))
    }

    pub fn liminal(&self) -> &LiminalQueue {
        &self.liminal
    }

    /// Build, sign, and hand a transaction to the node. Requests the chain
    /// cannot fund are dropped.
    pub async fn handle_request(&self, request: TxRequest) {
        if request.amount == 0 {
            debug!("dropping zero-amount transaction request");
            return;
        }
        let pub_key = self.keypair.public_key_hex();
        let needed = request.amount.saturating_add(request.fee);
        let (selected, change) = match self.chain.collect_utxos_for(needed, &pub_key) {
            Some(selection) => selection,
            None => {
                debug!(amount = request.amount, fee = request.fee, "not enough unspent outputs");
                return;
            }
        };

        let mut inputs = Vec::with_capacity(selected.len());
        for info in &selected {
            let msg = match hex::decode(info.output.hash()) {
                Ok(bytes) => bytes,
                Err(error) => {
                    debug!(%error, "undecodable output hash, dropping request");
                    return;
                }
            };
            let signature = self.keypair.sign_hex(&msg);
            inputs.push(TransactionInput::new(
                info.tx_hash.clone(),
                info.output_index,
                signature,
                info.amount,
            ));
        }

        let mut outputs = vec![TransactionOutput::new(
            request.amount,
            request.to_pub_key.clone(),
        )];
        if change > 0 {
            outputs.push(TransactionOutput::new(change, pub_key));
        }

        let tx = Transaction::new(
            self.config.tx_version,
            inputs,
            outputs,
            self.config.default_lock_time,
        );
        debug!(tx = %tx.hash(), amount = request.amount, "sending transaction");
        self.liminal.add(tx.clone());
        if self.to_node.send(tx).await.is_err() {
            debug!("node receiver gone, transaction dropped");
        }
    }

    /// A safe block arrived. Age the liminal queue and replay whatever has
    /// waited too long, bumping the lock time so the replay hashes
    /// differently from the original.
    pub async fn handle_block(&self, block: &Block) {
        if block.transactions.is_empty() {
            return;
        }
        let replay = self.liminal.reconcile(&block.transactions);
        for mut tx in replay {
            tx.lock_time += 1;
            debug!(tx = %tx.hash(), "replaying unconfirmed transaction");
            if self.to_node.send(tx.clone()).await.is_err() {
                return;
            }
            self.liminal.add(tx);
        }
    }
}
