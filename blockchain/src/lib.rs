pub mod config;

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use tracing::debug;

use types::tx::{parse_utxo_key, utxo_key, Transaction, TransactionInput, TransactionOutput};
use types::{Block, BlockHeader};

pub use config::{ChainConfig, GENESIS_PUB_KEY, GENESIS_SECRET_KEY};

/// One block of the tree together with the branch state derived up to it:
/// every output spendable on the chain that ends at this block.
#[derive(Debug, Clone)]
struct ChainNode {
    block: Block,
    /// Hash of the parent node, a handle into the node map. `None` only for
    /// genesis.
    parent: Option<String>,
    utxo: HashMap<String, TransactionOutput>,
    depth: u32,
}

struct ChainState {
    nodes: HashMap<String, ChainNode>,
    /// Deepest leaf; its ancestry is the main chain. Ties keep the first
    /// leaf seen.
    main_leaf: String,
}

/// The block tree. Stores every fork, not just the main chain; a single
/// mutex serializes all access.
pub struct Blockchain {
    state: Mutex<ChainState>,
}

/// What the wallet needs to turn a selected output into an input.
#[derive(Debug, Clone)]
pub struct UtxoInfo {
    pub tx_hash: String,
    pub output_index: u32,
    pub output: TransactionOutput,
    pub amount: u32,
}

impl Blockchain {
    /// A fresh tree holding only the genesis block; its single output seeds
    /// the root UTXO snapshot.
    pub fn new(config: &ChainConfig) -> Self {
        let genesis = genesis_block(config);
        let genesis_tx = &genesis.transactions[0];
        let mut utxo = HashMap::new();
        utxo.insert(
            utxo_key(&genesis_tx.hash(), 0),
            genesis_tx.outputs[0].clone(),
        );
        let hash = genesis.hash();
        let root = ChainNode {
            block: genesis,
            parent: None,
            utxo,
            depth: 0,
        };
        Self {
            state: Mutex::new(ChainState {
                nodes: HashMap::from([(hash.clone(), root)]),
                main_leaf: hash,
            }),
        }
    }

    /// Insert `block` under its parent, deriving the new snapshot by
    /// deleting consumed outputs and adding produced ones. Blocks with an
    /// unknown parent or no transactions are dropped silently.
    pub fn add(&self, block: &Block) {
        let mut state = self.state.lock().unwrap();
        if block.transactions.is_empty() {
            debug!(block = %block.hash(), "dropping block without transactions");
            return;
        }
        let parent_hash = block.header.prev_block_hash.clone();
        let (mut utxo, depth) = match state.nodes.get(&parent_hash) {
            Some(parent) => (parent.utxo.clone(), parent.depth + 1),
            None => {
                debug!(block = %block.hash(), parent = %parent_hash, "dropping block with unknown parent");
                return;
            }
        };
        for tx in &block.transactions {
            for input in &tx.inputs {
                utxo.remove(&input.utxo_key());
            }
        }
        for tx in &block.transactions {
            let tx_hash = tx.hash();
            for (index, output) in tx.outputs.iter().enumerate() {
                utxo.insert(utxo_key(&tx_hash, index as u32), output.clone());
            }
        }
        let hash = block.hash();
        let extends_main = parent_hash == state.main_leaf;
        debug!(block = %hash, depth, extends_main, "adding block");
        state.nodes.insert(
            hash.clone(),
            ChainNode {
                block: block.clone(),
                parent: Some(parent_hash),
                utxo,
                depth,
            },
        );
        if extends_main {
            state.main_leaf = hash;
        }
    }

    /// Number of blocks on the main chain; genesis counts as one.
    pub fn length(&self) -> u32 {
        let state = self.state.lock().unwrap();
        state.nodes[&state.main_leaf].depth + 1
    }

    pub fn get(&self, hash: &str) -> Option<Block> {
        let state = self.state.lock().unwrap();
        state.nodes.get(hash).map(|node| node.block.clone())
    }

    /// Depth of the block with `hash`, or -1 when unknown.
    pub fn index_of(&self, hash: &str) -> i64 {
        let state = self.state.lock().unwrap();
        state
            .nodes
            .get(hash)
            .map(|node| node.depth as i64)
            .unwrap_or(-1)
    }

    pub fn last_block(&self) -> Block {
        let state = self.state.lock().unwrap();
        state.nodes[&state.main_leaf].block.clone()
    }

    /// The whole main chain, genesis first.
    pub fn list(&self) -> Vec<Block> {
        self.slice_inner(0, u32::MAX)
    }

    /// Main-chain blocks with depth in `start..end`, in chain order.
    pub fn slice(&self, start: u32, end: u32) -> Vec<Block> {
        self.slice_inner(start, end)
    }

    fn slice_inner(&self, start: u32, end: u32) -> Vec<Block> {
        let state = self.state.lock().unwrap();
        let mut blocks = Vec::new();
        let mut cursor = Some(state.main_leaf.clone());
        while let Some(hash) = cursor {
            let node = match state.nodes.get(&hash) {
                Some(node) => node,
                None => break,
            };
            if node.depth < start {
                break;
            }
            if node.depth < end {
                blocks.push(node.block.clone());
            }
            cursor = node.parent.clone();
        }
        blocks.reverse();
        blocks
    }

    /// Would `block` extend the current main leaf?
    pub fn is_end_main_chain(&self, block: &Block) -> bool {
        let state = self.state.lock().unwrap();
        block.header.prev_block_hash == state.main_leaf
    }

    /// The output `input` references, looked up in the main-leaf snapshot.
    pub fn utxo_for_input(&self, input: &TransactionInput) -> Option<TransactionOutput> {
        let state = self.state.lock().unwrap();
        state.nodes[&state.main_leaf]
            .utxo
            .get(&input.utxo_key())
            .cloned()
    }

    /// True when `input` references nothing spendable on the main chain.
    pub fn is_unknown_input(&self, input: &TransactionInput) -> bool {
        let state = self.state.lock().unwrap();
        !state.nodes[&state.main_leaf]
            .utxo
            .contains_key(&input.utxo_key())
    }

    /// Verify that every input of `txs` references an entry in the snapshot
    /// at `prev_hash`. An unknown `prev_hash` falls back to the main-leaf
    /// snapshot, so blocks referencing unreachable parents are evaluated
    /// against the tip instead of rejected. Double spends within `txs`
    /// themselves are not detected.
    pub fn inputs_exist_at(&self, prev_hash: &str, txs: &[Transaction]) -> bool {
        let state = self.state.lock().unwrap();
        let node = match state.nodes.get(prev_hash) {
            Some(node) => node,
            None => &state.nodes[&state.main_leaf],
        };
        txs.iter().all(|tx| {
            tx.inputs
                .iter()
                .all(|input| node.utxo.contains_key(&input.utxo_key()))
        })
    }

    /// Collect main-leaf outputs locked to `pub_key` until they cover
    /// `amount`, marking each one `liminal` so a second request cannot
    /// reserve it. Returns the selection and the change, or `None` when the
    /// funds don't stretch; in that case every reservation in the snapshot
    /// is released.
    pub fn collect_utxos_for(&self, amount: u32, pub_key: &str) -> Option<(Vec<UtxoInfo>, u32)> {
        let mut state = self.state.lock().unwrap();
        let main_leaf = state.main_leaf.clone();
        let node = state.nodes.get_mut(&main_leaf)?;

        if amount == 0 {
            return Some((Vec::new(), 0));
        }

        let mut selected = Vec::new();
        let mut remaining = amount;
        for (key, output) in node.utxo.iter_mut() {
            if output.liminal || output.locking_script != pub_key {
                continue;
            }
            let (tx_hash, output_index) = match parse_utxo_key(key) {
                Some(parts) => parts,
                None => continue,
            };
            output.liminal = true;
            selected.push(UtxoInfo {
                tx_hash,
                output_index,
                amount: output.amount,
                output: output.clone(),
            });
            if output.amount >= remaining {
                return Some((selected, output.amount - remaining));
            }
            remaining -= output.amount;
        }

        for output in node.utxo.values_mut() {
            output.liminal = false;
        }
        None
    }

    /// Sum of main-leaf outputs locked to `pub_key`.
    pub fn balance(&self, pub_key: &str) -> u32 {
        let state = self.state.lock().unwrap();
        state.nodes[&state.main_leaf]
            .utxo
            .values()
            .filter(|output| output.locking_script == pub_key)
            .map(|output| output.amount)
            .sum()
    }

    /// How many spendable outputs `pub_key` holds on the main chain.
    pub fn utxo_count(&self, pub_key: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.nodes[&state.main_leaf]
            .utxo
            .values()
            .filter(|output| output.locking_script == pub_key)
            .count()
    }
}

impl fmt::Display for Blockchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<String> = self
            .list()
            .iter()
            .map(|block| format!("block-{}", &block.hash()[..8]))
            .collect();
        write!(f, "[{}]", tags.join(", "))
    }
}

/// The fixed first block: everything zeroed except one coinbase-style
/// transaction paying the initial subsidy to the genesis key.
pub fn genesis_block(config: &ChainConfig) -> Block {
    let genesis_tx = Transaction::new(
        0,
        Vec::new(),
        vec![TransactionOutput::new(
            config.initial_subsidy,
            config.genesis_pub_key.clone(),
        )],
        0,
    );
    Block {
        header: BlockHeader {
            version: 0,
            prev_block_hash: String::new(),
            merkle_root: String::new(),
            timestamp: 0,
            difficulty_target: String::new(),
            nonce: 0,
        },
        transactions: vec![genesis_tx],
    }
}
