use std::sync::Mutex;

use txpool::TxHeap;
use types::Transaction;

/// Self-originated transactions that are out on the network but not yet
/// buried under enough proof of work. Keyed by age: how many safe blocks
/// have been seen since the transaction went out.
pub struct LiminalQueue {
    heap: Mutex<TxHeap>,
    replay_threshold: u32,
}

impl LiminalQueue {
    pub fn new(replay_threshold: u32) -> Self {
        Self {
            heap: Mutex::new(TxHeap::new()),
            replay_threshold,
        }
    }

    /// Enroll a freshly sent transaction at age zero.
    pub fn add(&self, tx: Transaction) {
        self.heap.lock().unwrap().add(0, tx);
    }

    pub fn len(&self) -> usize {
        self.heap.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Called once per safe block: every age advances, anything confirmed by
    /// `txs` leaves the queue, and whatever reached the replay threshold is
    /// removed and returned so the wallet can send it again.
    pub fn reconcile(&self, txs: &[Transaction]) -> Vec<Transaction> {
        let mut heap = self.heap.lock().unwrap();
        heap.increment_all();
        heap.remove_matching(txs);
        heap.remove_above(self.replay_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::tx::TransactionOutput;

    fn tx(amount: u32) -> Transaction {
        Transaction::new(0, vec![], vec![TransactionOutput::new(amount, "pk")], 0)
    }

    #[test]
    fn ages_out_after_threshold_safe_blocks() {
        let queue = LiminalQueue::new(3);
        let pending = tx(1);
        queue.add(pending.clone());

        let unrelated = [tx(9)];
        assert!(queue.reconcile(&unrelated).is_empty()); // age 1
        assert!(queue.reconcile(&unrelated).is_empty()); // age 2
        let replay = queue.reconcile(&unrelated); // age 3: due
        assert_eq!(replay.len(), 1);
        assert_eq!(replay[0].hash(), pending.hash());
        assert!(queue.is_empty());
    }

    #[test]
    fn confirmed_transactions_leave_quietly() {
        let queue = LiminalQueue::new(3);
        let pending = tx(1);
        queue.add(pending.clone());

        let replay = queue.reconcile(std::slice::from_ref(&pending));
        assert!(replay.is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn younger_entries_keep_waiting() {
        let queue = LiminalQueue::new(3);
        queue.add(tx(1));
        let unrelated = [tx(9)];
        queue.reconcile(&unrelated);
        queue.reconcile(&unrelated);
        queue.add(tx(2)); // age 0 while the first is at 2

        let replay = queue.reconcile(&unrelated);
        assert_eq!(replay.len(), 1);
        assert_eq!(queue.len(), 1);
    }
}
