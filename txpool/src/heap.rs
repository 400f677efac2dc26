use types::Transaction;

/// One ranked entry.
#[derive(Debug, Clone)]
pub struct HeapNode {
    pub priority: u32,
    pub tx: Transaction,
}

/// Array-backed max-heap of transactions keyed on an integer priority.
/// Bulk removals rebuild the heap afterwards; equal priorities have no
/// defined order.
#[derive(Debug, Clone, Default)]
pub struct TxHeap {
    nodes: Vec<HeapNode>,
}

impl TxHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add(&mut self, priority: u32, tx: Transaction) {
        self.nodes.push(HeapNode { priority, tx });
        self.sift_up(self.nodes.len() - 1);
    }

    /// Remove and return the highest-priority entry.
    pub fn pop(&mut self) -> Option<HeapNode> {
        if self.nodes.is_empty() {
            return None;
        }
        let node = self.nodes.swap_remove(0);
        if !self.nodes.is_empty() {
            self.sift_down(0);
        }
        Some(node)
    }

    pub fn peek(&self) -> Option<&HeapNode> {
        self.nodes.first()
    }

    pub fn increment_all(&mut self) {
        for node in &mut self.nodes {
            node.priority += 1;
        }
    }

    pub fn contains(&self, tx: &Transaction) -> bool {
        let hash = tx.hash();
        self.nodes.iter().any(|node| node.tx.hash() == hash)
    }

    /// Entries in internal array order, root first. Block packing walks
    /// this rather than draining the heap.
    pub fn iter(&self) -> impl Iterator<Item = &HeapNode> {
        self.nodes.iter()
    }

    /// Remove every stored transaction whose hash matches one in `txs`,
    /// returning the subset actually removed.
    pub fn remove_matching(&mut self, txs: &[Transaction]) -> Vec<Transaction> {
        let mut removed = Vec::new();
        for tx in txs {
            let hash = tx.hash();
            if let Some(at) = self.nodes.iter().position(|node| node.tx.hash() == hash) {
                removed.push(self.nodes.swap_remove(at).tx);
            }
        }
        self.rebuild();
        removed
    }

    /// Remove and return every transaction at or above `threshold`.
    pub fn remove_above(&mut self, threshold: u32) -> Vec<Transaction> {
        let mut removed = Vec::new();
        let mut at = 0;
        while at < self.nodes.len() {
            if self.nodes[at].priority >= threshold {
                removed.push(self.nodes.swap_remove(at).tx);
            } else {
                at += 1;
            }
        }
        self.rebuild();
        removed
    }

    fn rebuild(&mut self) {
        if self.nodes.len() < 2 {
            return;
        }
        for at in (0..self.nodes.len() / 2).rev() {
            self.sift_down(at);
        }
    }

    fn sift_up(&mut self, mut at: usize) {
        while at > 0 {
            let parent = (at - 1) / 2;
            if self.nodes[at].priority <= self.nodes[parent].priority {
                break;
            }
            self.nodes.swap(at, parent);
            at = parent;
        }
    }

    fn sift_down(&mut self, mut at: usize) {
        loop {
            let left = 2 * at + 1;
            let right = 2 * at + 2;
            let mut largest = at;
            if left < self.nodes.len() && self.nodes[left].priority > self.nodes[largest].priority {
                largest = left;
            }
            if right < self.nodes.len() && self.nodes[right].priority > self.nodes[largest].priority
            {
                largest = right;
            }
            if largest == at {
                break;
            }
            self.nodes.swap(at, largest);
            at = largest;
        }
    }
}
