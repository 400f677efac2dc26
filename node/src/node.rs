use std::sync::{Arc, Mutex, RwLock};

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use blockchain::Blockchain;
use crypto::Keypair;
use miner::{Miner, MinerSignal};
use p2p::{AddressDirectory, Client, PeerDirectory, PeerRecord};
use types::network::{
    Addresses, GetBlocksRequest, GetBlocksResponse, GetDataRequest, GetDataResponse, NetAddress,
    VersionRequest,
};
use types::{Block, Transaction};
use wallet::{TxRequest, Wallet};

use crate::config::NodeConfig;
use crate::seen::SeenCache;
use crate::server;

/// Bound on the seen-sets; stale entries fall off the back.
const SEEN_CACHE_CAPACITY: usize = 1 << 16;

/// Receiver halves handed over when the node starts.
struct Receivers {
    wallet_rx: mpsc::Receiver<Transaction>,
    miner: Option<(mpsc::Receiver<Block>, mpsc::Receiver<MinerSignal>)>,
}

/// The message router gluing the chain, miner, wallet, and network
/// together. Every RPC-exposed method is safe to invoke concurrently.
pub struct Node {
    pub config: NodeConfig,
    keypair: Arc<Keypair>,
    addr: RwLock<String>,
    chain: Arc<Blockchain>,
    wallet: Option<Arc<Wallet>>,
    miner: Option<Arc<Miner>>,
    peers: PeerDirectory,
    addresses: AddressDirectory,
    client: Client,
    seen_txs: Mutex<SeenCache>,
    seen_blocks: Mutex<SeenCache>,
    server: Mutex<Option<JoinHandle<()>>>,
    /// Kept so the wallet channel never closes under the receiver loop.
    _wallet_tx: mpsc::Sender<Transaction>,
    receivers: Mutex<Option<Receivers>>,
}

impl Node {
    /// A node with a freshly generated identity.
    pub fn new(config: NodeConfig) -> Result<Arc<Self>> {
        let keypair = Arc::new(Keypair::random()?);
        Self::with_keypair(config, keypair)
    }

    /// A node with a caller-supplied identity (e.g. the genesis key).
    pub fn with_keypair(config: NodeConfig, keypair: Arc<Keypair>) -> Result<Arc<Self>> {
        let chain = Arc::new(Blockchain::new(&config.chain));
        let (wallet_tx, wallet_rx) = mpsc::channel(1);
        let wallet = Wallet::new(
            config.wallet.clone(),
            keypair.clone(),
            chain.clone(),
            wallet_tx.clone(),
        );
        let mut miner_receivers = None;
        let miner = Miner::new(
            config.miner.clone(),
            keypair.public_key_hex(),
            chain.last_block().hash(),
        )
        .map(|(miner, block_rx, signal_rx)| {
            miner_receivers = Some((block_rx, signal_rx));
            miner
        });

        Ok(Arc::new(Self {
            peers: PeerDirectory::new(config.peer_limit),
            addresses: AddressDirectory::new(config.addr_limit),
            config,
            keypair,
            addr: RwLock::new(String::new()),
            chain,
            wallet,
            miner,
            client: Client::new()?,
            seen_txs: Mutex::new(SeenCache::new(SEEN_CACHE_CAPACITY)),
            seen_blocks: Mutex::new(SeenCache::new(SEEN_CACHE_CAPACITY)),
            server: Mutex::new(None),
            _wallet_tx: wallet_tx,
            receivers: Mutex::new(Some(Receivers {
                wallet_rx,
                miner: miner_receivers,
            })),
        }))
    }

    pub fn addr(&self) -> String {
        self.addr.read().unwrap().clone()
    }

    pub fn public_key_hex(&self) -> String {
        self.keypair.public_key_hex()
    }

    pub fn chain(&self) -> &Arc<Blockchain> {
        &self.chain
    }

    pub fn miner(&self) -> Option<&Arc<Miner>> {
        self.miner.as_ref()
    }

    pub fn wallet(&self) -> Option<&Arc<Wallet>> {
        self.wallet.as_ref()
    }

    pub fn peers(&self) -> &PeerDirectory {
        &self.peers
    }

    pub fn addresses(&self) -> &AddressDirectory {
        &self.addresses
    }

    pub fn balance(&self, pub_key: &str) -> u32 {
        self.chain.balance(pub_key)
    }

    pub fn seen_tx_count(&self) -> usize {
        self.seen_txs.lock().unwrap().len()
    }

    /// Bind the listener, serve the RPC surface, and spawn the receiver
    /// loops for wallet transactions and mined blocks. A failed bind is
    /// fatal to the caller.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        *self.addr.write().unwrap() = addr.to_string();
        info!(addr = %addr, "node started");
        self.spawn_server(listener);

        let Receivers {
            mut wallet_rx,
            miner: miner_receivers,
        } = self
            .receivers
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| anyhow!("node already started"))?;

        let node = self.clone();
        tokio::spawn(async move {
            while let Some(tx) = wallet_rx.recv().await {
                node.handle_wallet_tx(tx).await;
            }
        });

        if let Some((mut block_rx, signal_rx)) = miner_receivers {
            let miner = self.miner.clone().expect("miner receivers without miner");
            tokio::spawn(miner.run(signal_rx));
            let node = self.clone();
            tokio::spawn(async move {
                while let Some(block) = block_rx.recv().await {
                    node.handle_miner_block(block).await;
                }
            });
        }
        Ok(())
    }

    fn spawn_server(self: &Arc<Self>, listener: TcpListener) {
        let router = server::router(self.clone());
        let handle = tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, router).await {
                debug!(%error, "rpc server stopped");
            }
        });
        *self.server.lock().unwrap() = Some(handle);
    }

    /// Stop answering the network; in-memory state stays put.
    pub fn pause_network(&self) {
        if let Some(handle) = self.server.lock().unwrap().take() {
            handle.abort();
        }
        info!(addr = %self.addr(), "network paused");
    }

    /// Rebind the previous address and serve again.
    pub async fn resume_network(self: &Arc<Self>) -> Result<()> {
        let addr = self.addr();
        let listener = TcpListener::bind(&addr).await?;
        self.spawn_server(listener);
        info!(addr = %addr, "network resumed");
        Ok(())
    }

    pub async fn start_miner(&self) {
        if let Some(miner) = &self.miner {
            miner.start().await;
        }
    }

    /// Tear the node down: stop mining and stop serving.
    pub async fn kill(&self) {
        if let Some(miner) = &self.miner {
            miner.kill().await;
        }
        self.pause_network();
    }

    /// User entry point: pay `amount` to `to_pub_key`, tipping miners `fee`.
    pub fn send_tx(&self, amount: u32, fee: u32, to_pub_key: String) {
        if amount == 0 {
            debug!("ignoring zero-amount send");
            return;
        }
        if to_pub_key.is_empty() {
            debug!("ignoring send without recipient");
            return;
        }
        if let Some(wallet) = &self.wallet {
            let wallet = wallet.clone();
            tokio::spawn(async move {
                wallet
                    .handle_request(TxRequest {
                        to_pub_key,
                        amount,
                        fee,
                    })
                    .await;
            });
        }
    }

    /// Initiate a handshake with `addr`.
    pub async fn connect_to_peer(&self, addr: &str) {
        let request = VersionRequest {
            version: self.config.version,
            addr_you: addr.to_string(),
            addr_me: self.addr(),
            best_height: self.chain.length(),
        };
        if let Err(error) = self.client.version(addr, &request).await {
            debug!(peer = %addr, %error, "version request got no response");
        }
    }

    /// Tell every peer our own address.
    pub async fn broadcast_addr(&self) {
        let batch = Addresses {
            addrs: vec![NetAddress {
                addr: self.addr(),
                last_seen: now_marker(),
            }],
        };
        for peer in self.peers.list() {
            let client = self.client.clone();
            let batch = batch.clone();
            tokio::spawn(async move {
                if let Err(error) = client.send_addresses(&peer.addr, &batch).await {
                    debug!(peer = %peer.addr, %error, "send addresses got no response");
                }
            });
        }
    }

    /// Catch up with the network: ask every peer for our missing block
    /// hashes, take the longest answer, and fetch those blocks from that
    /// peer in order.
    pub async fn bootstrap(&self) -> Result<()> {
        let peers = self.peers.list();
        if peers.is_empty() {
            bail!("no peers to bootstrap from");
        }
        let top = self.chain.last_block().hash();
        info!(peers = peers.len(), top = %top, "bootstrapping");

        let requests = peers.iter().map(|peer| {
            let client = self.client.clone();
            let addr = peer.addr.clone();
            let request = GetBlocksRequest {
                top_block_hash: top.clone(),
            };
            async move {
                let response = client.get_blocks(&addr, &request).await;
                (addr, response)
            }
        });
        let responses = futures::future::join_all(requests).await;

        let mut longest: Option<(String, GetBlocksResponse)> = None;
        for (addr, response) in responses {
            match response {
                Ok(response) => {
                    let better = longest
                        .as_ref()
                        .map(|(_, best)| response.block_hashes.len() > best.block_hashes.len())
                        .unwrap_or(true);
                    if better {
                        longest = Some((addr, response));
                    }
                }
                Err(error) => debug!(peer = %addr, %error, "get blocks got no response"),
            }
        }
        let (addr, response) = longest.ok_or_else(|| anyhow!("no peers gave responses"))?;

        // A very short catch-up also refreshes the miner's pool, since the
        // fetched blocks may confirm transactions it is still holding.
        let refresh_miner = response.block_hashes.len() <= 2;
        for block_hash in response.block_hashes {
            let data = match self
                .client
                .get_data(&addr, &GetDataRequest { block_hash })
                .await
            {
                Ok(data) => data,
                Err(error) => {
                    debug!(peer = %addr, %error, "get data got no response");
                    continue;
                }
            };
            let block = match data.block {
                Some(block) => block,
                None => continue,
            };
            self.seen_blocks.lock().unwrap().insert(block.hash());
            self.chain.add(&block);
            if refresh_miner {
                if let Some(miner) = &self.miner {
                    miner.handle_checked_block(&block).await;
                }
            }
        }
        Ok(())
    }

    /// A transaction freshly produced by our wallet: remember it, hand it to
    /// the miner, and gossip it.
    async fn handle_wallet_tx(&self, tx: Transaction) {
        if let Some(miner) = &self.miner {
            let miner = miner.clone();
            let tx = tx.clone();
            tokio::spawn(async move { miner.handle_tx(tx).await });
        }
        self.seen_txs.lock().unwrap().insert(tx.hash());
        self.gossip_tx(tx);
    }

    /// A block our own miner just solved: record, adopt, and gossip it.
    async fn handle_miner_block(&self, block: Block) {
        self.seen_blocks.lock().unwrap().insert(block.hash());
        self.chain.add(&block);
        self.notify_wallet_safe_block();
        self.gossip_block(block);
    }

    /// Hand the wallet the block that just became safe, if the chain is
    /// deep enough to have one.
    fn notify_wallet_safe_block(&self) {
        let wallet = match &self.wallet {
            Some(wallet) => wallet,
            None => return,
        };
        let window = self.config.wallet.safe_block_amount;
        if window == 0 {
            return;
        }
        let length = self.chain.length();
        let blocks = self.chain.slice(length.saturating_sub(window), length);
        if blocks.len() as u32 == window {
            let wallet = wallet.clone();
            let block = blocks[0].clone();
            tokio::spawn(async move { wallet.handle_block(&block).await });
        }
    }

    fn gossip_tx(&self, tx: Transaction) {
        for peer in self.peers.list() {
            let client = self.client.clone();
            let tx = tx.clone();
            debug!(peer = %peer.addr, tx = %tx.hash(), "forwarding transaction");
            tokio::spawn(async move {
                if let Err(error) = client.forward_transaction(&peer.addr, &tx).await {
                    debug!(peer = %peer.addr, %error, "forward transaction got no response");
                }
            });
        }
    }

    fn gossip_block(&self, block: Block) {
        for peer in self.peers.list() {
            let client = self.client.clone();
            let block = block.clone();
            debug!(peer = %peer.addr, block = %block.hash(), "forwarding block");
            tokio::spawn(async move {
                if let Err(error) = client.forward_block(&peer.addr, &block).await {
                    debug!(peer = %peer.addr, %error, "forward block got no response");
                }
            });
        }
    }

    /// Peering handshake. Records the caller in the address book and peer
    /// directory and answers with our own handshake, unless one is already
    /// in flight to them.
    pub async fn handle_version(&self, request: VersionRequest) {
        if request.version != self.config.version {
            return;
        }
        let addr = request.addr_me.clone();
        let now = now_marker();
        if self.addresses.get(&addr).is_some() {
            if self.addresses.update_last_seen(&addr, now).is_err() {
                return;
            }
        } else if self.addresses.add(addr.clone(), now).is_err() {
            return;
        }

        let record = PeerRecord {
            addr: addr.clone(),
            last_seen: now,
            version: request.version,
            best_height: request.best_height,
        };
        let pending = self
            .addresses
            .sent_version(&addr)
            .map(|at| at.elapsed() < self.config.version_timeout)
            .unwrap_or(false);
        if self.peers.add(record) && !pending {
            self.addresses.mark_version_sent(&addr);
            let reply = VersionRequest {
                version: self.config.version,
                addr_you: addr.clone(),
                addr_me: self.addr(),
                best_height: self.chain.length(),
            };
            if let Err(error) = self.client.version(&addr, &reply).await {
                debug!(peer = %addr, %error, "reciprocal version got no response");
            }
        }
    }

    /// Up to 500 main-chain successors of the caller's top block.
    pub fn handle_get_blocks(&self, request: GetBlocksRequest) -> GetBlocksResponse {
        let mut block_hashes = Vec::new();
        let index = self.chain.index_of(&request.top_block_hash);
        let length = self.chain.length() as i64;
        if index != -1 && index < length {
            let upper = length.min(index + 500);
            for block in self.chain.slice((index + 1) as u32, upper as u32) {
                block_hashes.push(block.hash());
            }
        }
        GetBlocksResponse { block_hashes }
    }

    /// A single block by hash, if we have it.
    pub fn handle_get_data(&self, request: GetDataRequest) -> GetDataResponse {
        let block = self.chain.get(&request.block_hash);
        if block.is_none() {
            debug!(block = %request.block_hash, "data requested for unknown block");
        }
        GetDataResponse { block }
    }

    /// Address gossip: adopt fresher last-seen stamps, try to peer with
    /// anything new, and relay the batch onwards when something was new.
    pub async fn handle_send_addresses(&self, batch: Addresses) {
        let my_addr = self.addr();
        let mut found_new = false;
        for address in &batch.addrs {
            if address.addr == my_addr {
                continue;
            }
            if let Some(peer) = self.peers.get(&address.addr) {
                if peer.last_seen < address.last_seen {
                    if let Err(error) = self.peers.update_last_seen(&address.addr, address.last_seen)
                    {
                        debug!(peer = %address.addr, %error, "stale peer update failed");
                    }
                    found_new = true;
                }
            } else if let Some(entry) = self.addresses.get(&address.addr) {
                if entry.last_seen < address.last_seen {
                    if let Err(error) = self
                        .addresses
                        .update_last_seen(&address.addr, address.last_seen)
                    {
                        debug!(addr = %address.addr, %error, "stale address update failed");
                    }
                }
            } else if self.addresses.add(address.addr.clone(), address.last_seen).is_ok() {
                found_new = true;
            }

            // Try to peer with each one; a repeat handshake is harmless and
            // may be a reboot.
            let client = self.client.clone();
            let target = address.addr.clone();
            let request = VersionRequest {
                version: self.config.version,
                addr_you: target.clone(),
                addr_me: my_addr.clone(),
                best_height: self.chain.length(),
            };
            tokio::spawn(async move {
                if let Err(error) = client.version(&target, &request).await {
                    debug!(peer = %target, %error, "version request got no response");
                }
            });
        }

        if found_new {
            for peer in self.peers.get_random(2, &[my_addr.clone()]) {
                if let Err(error) = self.client.send_addresses(&peer.addr, &batch).await {
                    debug!(peer = %peer.addr, %error, "address relay got no response");
                }
            }
        }
    }

    /// Dump the address book.
    pub fn handle_get_addresses(&self) -> Addresses {
        Addresses {
            addrs: self.addresses.snapshot(),
        }
    }

    /// Transaction gossip. Returns false when the transaction was rejected.
    pub async fn handle_forward_transaction(&self, tx: Transaction) -> bool {
        let hash = tx.hash();
        if self.seen_txs.lock().unwrap().contains(&hash) {
            return true;
        }
        if !self.check_tx(&tx) {
            debug!(tx = %hash, "received invalid transaction");
            return false;
        }
        debug!(tx = %hash, "received valid transaction");
        if let Some(miner) = &self.miner {
            let miner = miner.clone();
            let tx = tx.clone();
            tokio::spawn(async move { miner.handle_tx(tx).await });
        }
        self.seen_txs.lock().unwrap().insert(hash);
        self.gossip_tx(tx);
        true
    }

    /// Block gossip. Returns false when the block was rejected.
    pub async fn handle_forward_block(&self, block: Block) -> bool {
        if !self.seen_blocks.lock().unwrap().insert(block.hash()) {
            return true;
        }
        if !self.check_block(&block) {
            debug!(block = %block.hash(), "received invalid block");
            return false;
        }
        let extends_main = self.chain.is_end_main_chain(&block);
        self.chain.add(&block);
        if extends_main {
            if let Some(miner) = &self.miner {
                let miner = miner.clone();
                let block = block.clone();
                tokio::spawn(async move { miner.handle_block(&block).await });
            }
            self.notify_wallet_safe_block();
        }
        self.gossip_block(block);
        true
    }
}

/// Freshness marker for last-seen stamps. Nanosecond-derived so immediate
/// re-handshakes still read as a change.
fn now_marker() -> u32 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default() as u32
}
