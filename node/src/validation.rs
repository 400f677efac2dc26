use types::tx::TransactionOutput;
use types::{Block, Transaction};

use crate::node::Node;

impl Node {
    /// Transaction admission: structurally sound, funded by spendable
    /// outputs on the main chain, fee non-negative, within the size cap,
    /// and every input properly signed.
    pub fn check_tx(&self, tx: &Transaction) -> bool {
        for input in &tx.inputs {
            if self.chain().is_unknown_input(input) {
                return false;
            }
            let utxo = match self.chain().utxo_for_input(input) {
                Some(utxo) => utxo,
                None => return false,
            };
            if !unlocks(&utxo, &input.unlocking_script) {
                return false;
            }
        }

        !tx.inputs.is_empty()
            && !tx.outputs.is_empty()
            && tx.sum_outputs() > 0
            && tx.sum_inputs() > 0
            && tx.sum_inputs() >= tx.sum_outputs()
            && tx.size() <= self.config.max_block_size
    }

    /// Block admission: a single leading coinbase paying something, every
    /// other transaction funded on the block's own branch, size cap, and
    /// the block's claimed difficulty target actually met.
    pub fn check_block(&self, block: &Block) -> bool {
        if block.transactions.is_empty() {
            return false;
        }
        for (at, tx) in block.transactions.iter().enumerate() {
            if at == 0 && (!tx.is_coinbase() || tx.outputs.is_empty() || tx.sum_outputs() == 0) {
                return false;
            }
            if at != 0 && tx.is_coinbase() {
                return false;
            }
        }
        if !self
            .chain()
            .inputs_exist_at(&block.header.prev_block_hash, &block.transactions[1..])
        {
            return false;
        }
        if block.size() > self.config.max_block_size {
            return false;
        }
        block.satisfies_pow(&block.header.difficulty_target)
    }
}

/// Does `signature_hex` unlock `output`? ECDSA verification over the
/// output's hash; decode failures fail closed.
fn unlocks(output: &TransactionOutput, signature_hex: &str) -> bool {
    let msg = match hex::decode(output.hash()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    crypto::verify_hex(&output.locking_script, &msg, signature_hex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use blockchain::{GENESIS_PUB_KEY, GENESIS_SECRET_KEY};
    use crypto::Keypair;
    use types::tx::TransactionInput;

    use crate::config::NodeConfig;

    fn genesis_node() -> Arc<Node> {
        let keypair = Arc::new(Keypair::from_hex(GENESIS_PUB_KEY, GENESIS_SECRET_KEY).unwrap());
        Node::with_keypair(NodeConfig::nil(0), keypair).unwrap()
    }

    /// A transaction spending the genesis output, correctly signed.
    fn spend_genesis(node: &Node, amount: u32, fee: u32) -> Transaction {
        let keypair = Keypair::from_hex(GENESIS_PUB_KEY, GENESIS_SECRET_KEY).unwrap();
        let genesis_tx = &node.chain().last_block().transactions[0];
        let output = &genesis_tx.outputs[0];
        let msg = hex::decode(output.hash()).unwrap();
        let signature = keypair.sign_hex(&msg);
        let change = output.amount - amount - fee;
        Transaction::new(
            0,
            vec![TransactionInput::new(
                genesis_tx.hash(),
                0,
                signature,
                output.amount,
            )],
            vec![
                TransactionOutput::new(amount, "recipient"),
                TransactionOutput::new(change, GENESIS_PUB_KEY),
            ],
            0,
        )
    }

    #[test]
    fn well_formed_spend_is_accepted() {
        let node = genesis_node();
        let tx = spend_genesis(&node, 10, 50);
        assert!(node.check_tx(&tx));
    }

    #[test]
    fn bad_signature_is_rejected() {
        let node = genesis_node();
        let mut tx = spend_genesis(&node, 10, 50);
        tx.inputs[0].unlocking_script = Keypair::random()
            .unwrap()
            .sign_hex(&hex::decode(node.chain().last_block().transactions[0].outputs[0].hash()).unwrap());
        assert!(!node.check_tx(&tx));
    }

    #[test]
    fn unknown_input_is_rejected() {
        let node = genesis_node();
        let mut tx = spend_genesis(&node, 10, 50);
        tx.inputs[0].prev_tx_hash = "00".repeat(32);
        assert!(!node.check_tx(&tx));
    }

    #[test]
    fn structural_defects_are_rejected() {
        let node = genesis_node();

        let mut no_outputs = spend_genesis(&node, 10, 50);
        no_outputs.outputs.clear();
        assert!(!node.check_tx(&no_outputs));

        let coinbase = Transaction::new(
            0,
            vec![],
            vec![TransactionOutput::new(10, "recipient")],
            0,
        );
        assert!(!node.check_tx(&coinbase));

        // outputs exceeding inputs
        let mut overdraw = spend_genesis(&node, 10, 50);
        overdraw.outputs[0].amount = 1_000_000;
        assert!(!node.check_tx(&overdraw));
    }

    #[test]
    fn valid_block_passes() {
        let node = genesis_node();
        let coinbase = Transaction::new(0, vec![], vec![TransactionOutput::new(60, "miner")], 0);
        let spend = spend_genesis(&node, 10, 50);
        let block = Block::new(
            node.chain().last_block().hash(),
            vec![coinbase, spend],
            "f".repeat(64),
            1,
        );
        assert!(node.check_block(&block));
    }

    #[test]
    fn block_without_leading_coinbase_fails() {
        let node = genesis_node();
        let spend = spend_genesis(&node, 10, 50);
        let block = Block::new(
            node.chain().last_block().hash(),
            vec![spend],
            "f".repeat(64),
            1,
        );
        assert!(!node.check_block(&block));
    }

    #[test]
    fn block_with_second_coinbase_fails() {
        let node = genesis_node();
        let coinbase = Transaction::new(0, vec![], vec![TransactionOutput::new(60, "miner")], 0);
        let second = Transaction::new(0, vec![], vec![TransactionOutput::new(1, "miner")], 1);
        let block = Block::new(
            node.chain().last_block().hash(),
            vec![coinbase, second],
            "f".repeat(64),
            1,
        );
        assert!(!node.check_block(&block));
    }

    #[test]
    fn block_missing_proof_of_work_fails() {
        let node = genesis_node();
        let coinbase = Transaction::new(0, vec![], vec![TransactionOutput::new(60, "miner")], 0);
        let block = Block::new(
            node.chain().last_block().hash(),
            vec![coinbase],
            "0".repeat(64),
            1,
        );
        assert!(!node.check_block(&block));
    }

    #[test]
    fn block_spending_unknown_outputs_fails() {
        let node = genesis_node();
        let coinbase = Transaction::new(0, vec![], vec![TransactionOutput::new(60, "miner")], 0);
        let mut spend = spend_genesis(&node, 10, 50);
        spend.inputs[0].prev_tx_hash = "11".repeat(32);
        let block = Block::new(
            node.chain().last_block().hash(),
            vec![coinbase, spend],
            "f".repeat(64),
            1,
        );
        assert!(!node.check_block(&block));
    }
}
