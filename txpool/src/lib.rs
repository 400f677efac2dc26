mod heap;

pub use heap::{HeapNode, TxHeap};

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use types::Transaction;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxPoolConfig {
    /// Maximum number of pending transactions; adds beyond it are dropped.
    pub capacity: u32,
    /// Cumulative priority that must accrue before mining starts.
    pub priority_threshold: u32,
}

impl Default for TxPoolConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            priority_threshold: 10,
        }
    }
}

/// Valid transactions waiting to be mined, ranked by fee density. The heap
/// is mutex-guarded; the priority and count tallies are atomics so
/// `priority_met` never takes the lock.
pub struct TxPool {
    current_priority: AtomicU32,
    priority_threshold: u32,
    count: AtomicU32,
    capacity: u32,
    heap: Mutex<TxHeap>,
}

impl TxPool {
    pub fn new(config: &TxPoolConfig) -> Self {
        Self {
            current_priority: AtomicU32::new(0),
            priority_threshold: config.priority_threshold,
            count: AtomicU32::new(0),
            capacity: config.capacity,
            heap: Mutex::new(TxHeap::new()),
        }
    }

    pub fn len(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Has enough cumulative priority accrued to start mining?
    pub fn priority_met(&self) -> bool {
        self.current_priority.load(Ordering::Acquire) >= self.priority_threshold
    }

    /// Enqueue `tx` at its computed priority. A full pool drops it.
    pub fn add(&self, tx: Transaction) {
        let mut heap = self.heap.lock().unwrap();
        if self.len() >= self.capacity {
            debug!(tx = %tx.hash(), "transaction pool full, dropping");
            return;
        }
        let priority = calc_priority(&tx);
        heap.add(priority, tx);
        self.current_priority.fetch_add(priority, Ordering::AcqRel);
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    /// Drop every pool entry that also appears in `txs` (they were mined
    /// into a block). The tallies shrink by the set actually removed.
    pub fn remove_confirmed(&self, txs: &[Transaction]) {
        let mut heap = self.heap.lock().unwrap();
        let removed = heap.remove_matching(txs);
        let priority: u32 = removed.iter().map(calc_priority).sum();
        self.current_priority.fetch_sub(priority, Ordering::AcqRel);
        self.count.fetch_sub(removed.len() as u32, Ordering::AcqRel);
    }

    /// Copy of the heap contents in internal order, for block packing.
    pub fn snapshot(&self) -> Vec<HeapNode> {
        self.heap.lock().unwrap().iter().cloned().collect()
    }

    pub fn contains(&self, tx: &Transaction) -> bool {
        self.heap.lock().unwrap().contains(tx)
    }
}

/// Priority of `tx`: fee density scaled by 100, floored at 1 so zero-fee
/// transactions still rank. Must stay pure: removal bookkeeping recomputes
/// it for the entries it takes out.
pub fn calc_priority(tx: &Transaction) -> u32 {
    let fees = tx.sum_inputs().saturating_sub(tx.sum_outputs());
    let priority = fees.saturating_mul(100) / tx.size();
    if priority == 0 {
        1
    } else {
        priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::tx::{TransactionInput, TransactionOutput};

    /// inputs - outputs = fee, one input two outputs.
    fn fee_tx(input: u32, output: u32) -> Transaction {
        Transaction::new(
            0,
            vec![TransactionInput::new("ab".repeat(32), 0, "sig", input)],
            vec![
                TransactionOutput::new(output / 2, "pk1"),
                TransactionOutput::new(output - output / 2, "pk2"),
            ],
            0,
        )
    }

    #[test]
    fn zero_fee_priority_floors_at_one() {
        let tx = fee_tx(500, 500);
        assert_eq!(calc_priority(&tx), 1);
    }

    #[test]
    fn priority_is_fee_density() {
        let tx = fee_tx(600, 100);
        // size: 1 input (40) + 2 outputs (40) + 8 = 88
        assert_eq!(calc_priority(&tx), 500 * 100 / 88);
    }

    #[test]
    fn huge_fees_do_not_overflow() {
        let tx = fee_tx(u32::MAX, 0);
        assert_eq!(calc_priority(&tx), u32::MAX / tx.size());
    }

    #[test]
    fn add_tracks_count_and_priority() {
        let pool = TxPool::new(&TxPoolConfig::default());
        assert!(!pool.priority_met());
        pool.add(fee_tx(600, 100));
        assert_eq!(pool.len(), 1);
        assert!(pool.priority_met());
    }

    #[test]
    fn add_at_capacity_is_a_no_op() {
        let pool = TxPool::new(&TxPoolConfig {
            capacity: 1,
            priority_threshold: 10,
        });
        let first = fee_tx(600, 100);
        let second = fee_tx(700, 100);
        pool.add(first.clone());
        pool.add(second.clone());
        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&first));
        assert!(!pool.contains(&second));
    }

    #[test]
    fn remove_confirmed_restores_tallies() {
        let pool = TxPool::new(&TxPoolConfig::default());
        let a = fee_tx(600, 100);
        let b = fee_tx(700, 100);
        let c = fee_tx(800, 100);
        pool.add(a.clone());
        pool.add(b.clone());
        pool.add(c.clone());

        pool.remove_confirmed(&[a.clone(), b.clone()]);
        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&c));

        pool.remove_confirmed(&[c.clone()]);
        assert_eq!(pool.len(), 0);
        assert!(!pool.priority_met());
    }

    #[test]
    fn remove_confirmed_ignores_strangers() {
        let pool = TxPool::new(&TxPoolConfig::default());
        pool.add(fee_tx(600, 100));
        pool.remove_confirmed(&[fee_tx(900, 100)]);
        assert_eq!(pool.len(), 1);
    }
}
