mod common;

use common::*;

use p2p::Client;
use types::tx::{Transaction, TransactionInput, TransactionOutput};

/// One payment crosses a two-node network, gets mined by the receiver, and
/// both nodes end up with the same two-block chain and the right balances.
/// A second spend attempted before the first confirms never leaves the
/// wallet, because the only usable output is still reserved.
#[tokio::test(flavor = "multi_thread")]
async fn transaction_settles_across_two_nodes() {
    let a = start_genesis_node(1).await;
    let b = start_default_node(1).await;
    a.connect_to_peer(&b.addr()).await;
    settle(1).await;

    assert_peered(&a, &[&b]);
    assert_peered(&b, &[&a]);
    assert_chains_consistent(&[a.clone(), b.clone()]);

    a.send_tx(10, 50, b.public_key_hex());
    settle(1).await;
    assert_seen_txs(&a, 1);
    assert_seen_txs(&b, 1);

    // no unspent outputs left, so this one is dropped inside the wallet
    a.send_tx(10, 50, b.public_key_hex());
    settle(1).await;
    assert_seen_txs(&a, 1);
    assert_seen_txs(&b, 1);

    b.start_miner().await;
    settle(3).await;

    assert_chain_lengths(&[a.clone(), b.clone()], &[2, 2]);
    assert_chains_consistent(&[a.clone(), b.clone()]);
    assert_balance(&a, 100_000 - 60);
    assert_balance(&b, 10 + 50 + 10);

    a.kill().await;
    b.kill().await;
}

/// Two nodes pay each other at once; only the funded request becomes a
/// transaction, and after mining the balances reflect exactly one payment.
#[tokio::test(flavor = "multi_thread")]
async fn crossing_payments_settle() {
    let a = start_genesis_node(1).await;
    let b = start_default_node(1).await;
    a.connect_to_peer(&b.addr()).await;
    settle(1).await;

    a.send_tx(100, 100, b.public_key_hex());
    b.send_tx(100, 100, a.public_key_hex()); // unfunded, dropped
    settle(2).await;

    assert_seen_txs(&a, 1);
    assert_seen_txs(&b, 1);

    b.start_miner().await;
    settle(3).await;

    assert_chains_consistent(&[a.clone(), b.clone()]);
    assert_balance(&a, 100_000 - 200);
    assert_balance(&b, 100 + 10 + 100);

    a.kill().await;
    b.kill().await;
}

/// Zero-amount requests die before they touch the network.
#[tokio::test(flavor = "multi_thread")]
async fn zero_amount_send_produces_nothing() {
    let a = start_genesis_node(1).await;
    let b = start_default_node(1).await;
    a.connect_to_peer(&b.addr()).await;
    settle(1).await;

    a.send_tx(0, 0, b.public_key_hex());
    settle(1).await;

    assert_seen_txs(&a, 0);
    assert_seen_txs(&b, 0);

    a.kill().await;
    b.kill().await;
}

/// A malicious sender pushes transactions with a forged signature and with
/// a made-up input. Honest nodes reject both: nothing is gossiped, chains
/// and balances stay put.
#[tokio::test(flavor = "multi_thread")]
async fn invalid_transactions_are_rejected() {
    let a = start_genesis_node(1).await;
    let b = start_default_node(1).await;
    a.connect_to_peer(&b.addr()).await;
    settle(1).await;

    let client = Client::new().unwrap();
    let genesis_tx = a.chain().last_block().transactions[0].clone();
    let genesis_output = &genesis_tx.outputs[0];

    // signature from a key that does not own the output
    let intruder = crypto::Keypair::random().unwrap();
    let forged_sig = intruder.sign_hex(&hex::decode(genesis_output.hash()).unwrap());
    let forged = Transaction::new(
        0,
        vec![TransactionInput::new(
            genesis_tx.hash(),
            0,
            forged_sig,
            genesis_output.amount,
        )],
        vec![TransactionOutput::new(
            genesis_output.amount,
            intruder.public_key_hex(),
        )],
        0,
    );
    assert!(client.forward_transaction(&a.addr(), &forged).await.is_err());

    // spend of an output that never existed
    let phantom = Transaction::new(
        0,
        vec![TransactionInput::new(
            "42".repeat(32),
            0,
            intruder.sign_hex(b"anything"),
            500,
        )],
        vec![TransactionOutput::new(500, intruder.public_key_hex())],
        0,
    );
    assert!(client.forward_transaction(&a.addr(), &phantom).await.is_err());

    settle(1).await;
    assert_seen_txs(&a, 0);
    assert_seen_txs(&b, 0);
    assert_chain_lengths(&[a.clone(), b.clone()], &[1, 1]);
    assert_balance(&a, 100_000);
    assert_balance(&b, 0);

    a.kill().await;
    b.kill().await;
}
