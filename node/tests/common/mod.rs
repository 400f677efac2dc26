#![allow(dead_code)] // each test binary uses a different subset

use std::sync::Arc;
use std::time::Duration;

use blockchain::{GENESIS_PUB_KEY, GENESIS_SECRET_KEY};
use crypto::Keypair;
use node::{Node, NodeConfig};
use types::pow_target;

/// A started node holding the genesis key, mining against an easy target.
pub async fn start_genesis_node(pow_zeros: i32) -> Arc<Node> {
    let mut config = NodeConfig::new(0);
    config.miner.pow_target = pow_target(pow_zeros);
    let keypair = Arc::new(Keypair::from_hex(GENESIS_PUB_KEY, GENESIS_SECRET_KEY).unwrap());
    let node = Node::with_keypair(config, keypair).unwrap();
    node.start().await.unwrap();
    node
}

/// A started node with a fresh identity.
pub async fn start_default_node(pow_zeros: i32) -> Arc<Node> {
    let mut config = NodeConfig::new(0);
    config.miner.pow_target = pow_target(pow_zeros);
    let node = Node::new(config).unwrap();
    node.start().await.unwrap();
    node
}

/// Handshake every node with every other.
pub async fn connect_cluster(nodes: &[Arc<Node>]) {
    for a in nodes {
        for b in nodes {
            if !Arc::ptr_eq(a, b) {
                a.connect_to_peer(&b.addr()).await;
            }
        }
    }
}

pub fn assert_peered(node: &Node, others: &[&Arc<Node>]) {
    for other in others {
        assert!(
            node.peers().contains(&other.addr()),
            "{} is not peered with {}",
            node.addr(),
            other.addr()
        );
    }
}

pub fn assert_chain_lengths(nodes: &[Arc<Node>], lengths: &[u32]) {
    for (node, expected) in nodes.iter().zip(lengths) {
        assert_eq!(
            node.chain().length(),
            *expected,
            "{} has the wrong chain length",
            node.addr()
        );
    }
}

/// Every node's main chain carries identical block hashes.
pub fn assert_chains_consistent(nodes: &[Arc<Node>]) {
    let reference: Vec<String> = nodes[0].chain().list().iter().map(|b| b.hash()).collect();
    for node in &nodes[1..] {
        let chain: Vec<String> = node.chain().list().iter().map(|b| b.hash()).collect();
        assert_eq!(reference, chain, "main chains diverge at {}", node.addr());
    }
}

/// Balance of the node's own key.
pub fn assert_balance(node: &Node, expected: u32) {
    assert_eq!(
        node.balance(&node.public_key_hex()),
        expected,
        "{} has the wrong balance",
        node.addr()
    );
}

pub fn assert_seen_txs(node: &Node, expected: usize) {
    assert_eq!(
        node.seen_tx_count(),
        expected,
        "{} saw the wrong number of transactions",
        node.addr()
    );
}

pub async fn settle(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}
