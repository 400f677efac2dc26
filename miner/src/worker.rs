use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use txpool::TxPool;
use types::tx::TransactionOutput;
use types::{Block, Transaction};

use crate::MinerConfig;

/// Messages driving the mining loop.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MinerSignal {
    /// The pool changed; cancel any in-flight search and reconsider.
    PoolUpdated,
    /// Stop the loop for good.
    Shutdown,
}

/// Assumed size of the not-yet-built coinbase while packing a block.
const COINBASE_SIZE_ALLOWANCE: u32 = 100;

/// The proof-of-work worker. A single long-lived loop waits on the
/// pool-updated signal; every signal preempts the running nonce search, so
/// at most one search is ever active.
pub struct Miner {
    config: MinerConfig,
    /// Locking script mined rewards pay out to.
    public_key: String,
    pool: Arc<TxPool>,
    prev_hash: Mutex<String>,
    chain_len: AtomicU32,
    active: AtomicBool,
    mining: AtomicBool,
    block_tx: mpsc::Sender<Block>,
    signal_tx: mpsc::Sender<MinerSignal>,
}

impl Miner {
    /// Build the miner plus the receivers the node listens on: mined blocks
    /// and the signal stream to feed into [`Miner::run`]. A disabled config
    /// produces no miner.
    #[allow(clippy::type_complexity)]
    pub fn new(
        config: MinerConfig,
        public_key: String,
        prev_hash: String,
    ) -> Option<(Arc<Self>, mpsc::Receiver<Block>, mpsc::Receiver<MinerSignal>)> {
        if !config.enabled {
            return None;
        }
        let (block_tx, block_rx) = mpsc::channel(1);
        // capacity 1 keeps the rendezvous back-pressure: publishers wait
        // while the loop is busy
        let (signal_tx, signal_rx) = mpsc::channel(1);
        let pool = Arc::new(TxPool::new(&config.pool));
        let miner = Arc::new(Self {
            config,
            public_key,
            pool,
            prev_hash: Mutex::new(prev_hash),
            chain_len: AtomicU32::new(1),
            active: AtomicBool::new(false),
            mining: AtomicBool::new(false),
            block_tx,
            signal_tx,
        });
        Some((miner, block_rx, signal_rx))
    }

    pub fn pool(&self) -> &TxPool {
        &self.pool
    }

    pub fn is_mining(&self) -> bool {
        self.mining.load(Ordering::Acquire)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn set_prev_hash(&self, hash: String) {
        *self.prev_hash.lock().unwrap() = hash;
    }

    pub fn prev_hash(&self) -> String {
        self.prev_hash.lock().unwrap().clone()
    }

    pub fn set_chain_len(&self, len: u32) {
        self.chain_len.store(len, Ordering::Release);
    }

    pub fn chain_len(&self) -> u32 {
        self.chain_len.load(Ordering::Acquire)
    }

    pub async fn start(&self) {
        self.active.store(true, Ordering::Release);
        let _ = self.signal_tx.send(MinerSignal::PoolUpdated).await;
    }

    pub async fn pause(&self) {
        self.active.store(false, Ordering::Release);
        let _ = self.signal_tx.send(MinerSignal::PoolUpdated).await;
        debug!("mining paused");
    }

    pub async fn resume(&self) {
        self.active.store(true, Ordering::Release);
        let _ = self.signal_tx.send(MinerSignal::PoolUpdated).await;
        debug!("mining resumed");
    }

    /// Stop the loop permanently; any in-flight search is cancelled.
    pub async fn kill(&self) {
        self.active.store(false, Ordering::Release);
        let _ = self.signal_tx.send(MinerSignal::Shutdown).await;
    }

    /// A validated transaction from the wallet or the network.
    pub async fn handle_tx(&self, tx: Transaction) {
        self.pool.add(tx);
        if self.active.load(Ordering::Acquire) {
            let _ = self.signal_tx.send(MinerSignal::PoolUpdated).await;
        }
    }

    /// A block extended the main chain: point the next search at it, grow
    /// the length used for the subsidy, and reconcile the pool.
    pub async fn handle_block(&self, block: &Block) {
        self.set_prev_hash(block.hash());
        self.chain_len.fetch_add(1, Ordering::AcqRel);
        self.handle_checked_block(block).await;
    }

    /// Reconcile the pool with an accepted block without moving the mining
    /// target (used for blocks landing off the tip, e.g. during bootstrap).
    pub async fn handle_checked_block(&self, block: &Block) {
        self.pool.remove_confirmed(&block.transactions);
        if self.active.load(Ordering::Acquire) {
            let _ = self.signal_tx.send(MinerSignal::PoolUpdated).await;
        }
    }

    /// The mining loop. Owns the signal receiver; each signal cancels the
    /// current search before anything else happens.
    pub async fn run(self: Arc<Self>, mut signals: mpsc::Receiver<MinerSignal>) {
        let mut cancel: Option<Arc<AtomicBool>> = None;
        while let Some(signal) = signals.recv().await {
            if let Some(flag) = cancel.take() {
                flag.store(true, Ordering::Release);
            }
            if signal == MinerSignal::Shutdown {
                break;
            }
            if !self.active.load(Ordering::Acquire) {
                continue;
            }
            let flag = Arc::new(AtomicBool::new(false));
            cancel = Some(flag.clone());
            let miner = self.clone();
            tokio::task::spawn_blocking(move || miner.search(&flag));
        }
        if let Some(flag) = cancel.take() {
            flag.store(true, Ordering::Release);
        }
        debug!("mining loop stopped");
    }

    /// One attempt: pack a block from the pool and hunt for a nonce.
    /// Runs on a blocking thread.
    fn search(&self, cancel: &AtomicBool) {
        if !self.pool.priority_met() {
            return;
        }
        self.mining.store(true, Ordering::Release);
        let candidates = self.pack_block();
        let solved = match self.gen_coinbase_tx(&candidates) {
            Some(coinbase) => {
                let mut txs = Vec::with_capacity(candidates.len() + 1);
                txs.push(coinbase);
                txs.extend(candidates);
                let block = Block::new(
                    self.prev_hash(),
                    txs,
                    self.config.pow_target.clone(),
                    Utc::now().timestamp() as u32,
                );
                self.calc_nonce(cancel, block)
            }
            None => None,
        };
        self.mining.store(false, Ordering::Release);

        if let Some(block) = solved {
            info!(
                block = %block.hash(),
                txs = block.transactions.len(),
                prev = %block.header.prev_block_hash,
                "mined new block"
            );
            if self.block_tx.blocking_send(block.clone()).is_err() {
                return;
            }
            // process locally exactly like an accepted remote block
            self.set_prev_hash(block.hash());
            self.chain_len.fetch_add(1, Ordering::AcqRel);
            self.pool.remove_confirmed(&block.transactions);
            if self.active.load(Ordering::Acquire) {
                let _ = self.signal_tx.blocking_send(MinerSignal::PoolUpdated);
            }
        }
    }

    /// Nonce hunt over `0..nonce_limit`. Cancellation is observed once per
    /// iteration; a cancelled search discards the block.
    fn calc_nonce(&self, cancel: &AtomicBool, mut block: Block) -> Option<Block> {
        for nonce in 0..self.config.nonce_limit {
            if cancel.load(Ordering::Acquire) {
                return None;
            }
            block.header.nonce = nonce;
            if block.satisfies_pow(&self.config.pow_target) {
                return Some(block);
            }
        }
        None
    }

    /// Snapshot the highest-priority transactions that fit the block
    /// budget, walking the heap's internal order and leaving room for the
    /// coinbase.
    fn pack_block(&self) -> Vec<Transaction> {
        let mut size = COINBASE_SIZE_ALLOWANCE;
        let mut txs = Vec::new();
        for node in self.pool.snapshot() {
            size += node.tx.size();
            if size < self.config.block_size {
                txs.push(node.tx);
            } else {
                break;
            }
        }
        txs
    }

    /// The input-less transaction collecting subsidy plus fees. `None` when
    /// there is nothing worth mining.
    pub fn gen_coinbase_tx(&self, txs: &[Transaction]) -> Option<Transaction> {
        if txs.is_empty() {
            return None;
        }
        let mut inputs: u32 = 0;
        let mut outputs: u32 = 0;
        for tx in txs {
            inputs += tx.sum_inputs();
            outputs += tx.sum_outputs();
        }
        let fee = inputs.saturating_sub(outputs);

        let divisor = self.chain_len.load(Ordering::Acquire) / self.config.halving_rate;
        let subsidy = if divisor > self.config.max_halvings {
            0
        } else {
            2u32.checked_pow(divisor)
                .map(|halvings| self.config.initial_subsidy / halvings)
                .unwrap_or(0)
        };

        let reward = TransactionOutput::new(subsidy + fee, self.public_key.clone());
        Some(Transaction::new(
            self.config.version,
            Vec::new(),
            vec![reward],
            self.config.default_lock_time,
        ))
    }
}
