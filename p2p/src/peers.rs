use std::collections::HashMap;
use std::sync::Mutex;

use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::error::DirectoryError;

/// A node we are actively peered with.
#[derive(Debug, Clone)]
pub struct PeerRecord {
    pub addr: String,
    pub last_seen: u32,
    pub version: u32,
    pub best_height: u32,
}

/// Bounded map of connected peers.
pub struct PeerDirectory {
    peers: Mutex<HashMap<String, PeerRecord>>,
    limit: usize,
}

impl PeerDirectory {
    pub fn new(limit: usize) -> Self {
        Self {
            peers: Mutex::new(HashMap::new()),
            limit,
        }
    }

    /// Insert or refresh a peer. Succeeds iff the peer already exists with
    /// a changed last-seen, or it is new and there is room.
    pub fn add(&self, record: PeerRecord) -> bool {
        let mut peers = self.peers.lock().unwrap();
        match peers.get(&record.addr) {
            Some(old) if old.last_seen != record.last_seen => {
                peers.insert(record.addr.clone(), record);
                true
            }
            Some(_) => false,
            None if peers.len() < self.limit => {
                peers.insert(record.addr.clone(), record);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, addr: &str) -> Option<PeerRecord> {
        self.peers.lock().unwrap().get(addr).cloned()
    }

    pub fn contains(&self, addr: &str) -> bool {
        self.peers.lock().unwrap().contains_key(addr)
    }

    pub fn update_last_seen(&self, addr: &str, last_seen: u32) -> Result<(), DirectoryError> {
        let mut peers = self.peers.lock().unwrap();
        match peers.get_mut(addr) {
            Some(record) => {
                record.last_seen = last_seen;
                Ok(())
            }
            None => Err(DirectoryError::NotFound),
        }
    }

    pub fn list(&self) -> Vec<PeerRecord> {
        self.peers.lock().unwrap().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `n` shuffled peers, excluding the deny-list. Asking for at
    /// least the whole directory returns everything.
    pub fn get_random(&self, n: usize, exclude: &[String]) -> Vec<PeerRecord> {
        let peers = self.peers.lock().unwrap();
        if n >= peers.len() {
            return peers.values().cloned().collect();
        }
        let mut keys: Vec<&String> = peers
            .keys()
            .filter(|key| !exclude.contains(key))
            .collect();
        keys.shuffle(&mut thread_rng());
        keys.into_iter()
            .take(n)
            .map(|key| peers[key].clone())
            .collect()
    }
}
