mod common;

use common::*;

/// Bootstrapping against a network that has nothing new is a clean no-op.
#[tokio::test(flavor = "multi_thread")]
async fn bootstrap_with_nothing_to_fetch() {
    let a = start_genesis_node(1).await;
    let b = start_default_node(1).await;
    a.connect_to_peer(&b.addr()).await;
    settle(1).await;

    b.bootstrap().await.unwrap();
    settle(1).await;

    assert_chain_lengths(&[a.clone(), b.clone()], &[1, 1]);
    assert_chains_consistent(&[a.clone(), b.clone()]);

    a.kill().await;
    b.kill().await;
}

/// A node that missed four blocks pulls them all from the only peer and
/// converges on an identical chain.
#[tokio::test(flavor = "multi_thread")]
async fn bootstrap_catches_up_many_blocks() {
    let a = start_genesis_node(1).await;
    let b_config = node::NodeConfig::new(0);
    let b = node::Node::new(b_config).unwrap();

    a.start_miner().await;
    for _ in 0..4 {
        a.send_tx(10, 50, b.public_key_hex());
        settle(3).await;
    }
    assert_chain_lengths(&[a.clone()], &[5]);
    assert_eq!(b.chain().length(), 1);

    b.start().await.unwrap();
    a.connect_to_peer(&b.addr()).await;
    settle(1).await;

    b.bootstrap().await.unwrap();
    settle(1).await;

    assert_chain_lengths(&[a.clone(), b.clone()], &[5, 5]);
    assert_chains_consistent(&[a.clone(), b.clone()]);

    a.kill().await;
    b.kill().await;
}

/// Three nodes, two of which go dark at different heights. The one that
/// paused first resumes, bootstraps, and converges with the miner while the
/// other stays behind.
#[tokio::test(flavor = "multi_thread")]
async fn bootstrap_after_pause_converges() {
    let a = start_genesis_node(1).await;
    let b = start_default_node(1).await;
    let c = start_default_node(1).await;
    let cluster = [a.clone(), b.clone(), c.clone()];
    connect_cluster(&cluster).await;
    settle(1).await;

    c.pause_network();
    a.start_miner().await;
    a.send_tx(800, 50, b.public_key_hex());
    settle(5).await;

    b.pause_network();
    a.send_tx(200, 50, c.public_key_hex());
    settle(5).await;

    assert_chain_lengths(&cluster, &[3, 2, 1]);

    c.resume_network().await.unwrap();
    c.bootstrap().await.unwrap();
    settle(5).await;

    assert_chain_lengths(&cluster, &[3, 2, 3]);
    assert_chains_consistent(&[a.clone(), c.clone()]);

    a.kill().await;
    b.kill().await;
    c.kill().await;
}
