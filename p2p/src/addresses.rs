use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use types::network::NetAddress;

use crate::error::DirectoryError;

/// A known node address; `sent_version` remembers when we last initiated a
/// handshake with it, so reciprocal handshakes are not duplicated.
#[derive(Debug, Clone)]
pub struct AddressEntry {
    pub addr: String,
    pub last_seen: u32,
    pub sent_version: Option<Instant>,
}

/// Bounded book of addresses heard about on the network; a superset of the
/// peer directory.
pub struct AddressDirectory {
    addresses: Mutex<HashMap<String, AddressEntry>>,
    limit: usize,
}

impl AddressDirectory {
    pub fn new(limit: usize) -> Self {
        Self {
            addresses: Mutex::new(HashMap::new()),
            limit,
        }
    }

    /// Record a new address. Duplicates and overflow return typed errors
    /// that callers usually treat as a no-op.
    pub fn add(&self, addr: String, last_seen: u32) -> Result<(), DirectoryError> {
        let mut addresses = self.addresses.lock().unwrap();
        if addresses.contains_key(&addr) {
            return Err(DirectoryError::AlreadyExists);
        }
        if addresses.len() >= self.limit {
            return Err(DirectoryError::Full);
        }
        addresses.insert(
            addr.clone(),
            AddressEntry {
                addr,
                last_seen,
                sent_version: None,
            },
        );
        Ok(())
    }

    pub fn get(&self, addr: &str) -> Option<AddressEntry> {
        self.addresses.lock().unwrap().get(addr).cloned()
    }

    pub fn update_last_seen(&self, addr: &str, last_seen: u32) -> Result<(), DirectoryError> {
        let mut addresses = self.addresses.lock().unwrap();
        match addresses.get_mut(addr) {
            Some(entry) => {
                entry.last_seen = last_seen;
                Ok(())
            }
            None => Err(DirectoryError::NotFound),
        }
    }

    /// When did we last initiate a handshake with `addr`?
    pub fn sent_version(&self, addr: &str) -> Option<Instant> {
        self.addresses
            .lock()
            .unwrap()
            .get(addr)
            .and_then(|entry| entry.sent_version)
    }

    pub fn mark_version_sent(&self, addr: &str) {
        if let Some(entry) = self.addresses.lock().unwrap().get_mut(addr) {
            entry.sent_version = Some(Instant::now());
        }
    }

    pub fn list(&self) -> Vec<AddressEntry> {
        self.addresses.lock().unwrap().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.addresses.lock().unwrap().len()
    }

    /// The wire form of the whole book, for `GetAddresses` replies.
    pub fn snapshot(&self) -> Vec<NetAddress> {
        self.addresses
            .lock()
            .unwrap()
            .values()
            .map(|entry| NetAddress {
                addr: entry.addr.clone(),
                last_seen: entry.last_seen,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_rejects_duplicates_and_overflow() {
        let dir = AddressDirectory::new(2);
        assert!(dir.add("a".into(), 1).is_ok());
        assert_eq!(dir.add("a".into(), 2), Err(DirectoryError::AlreadyExists));
        assert!(dir.add("b".into(), 1).is_ok());
        assert_eq!(dir.add("c".into(), 1), Err(DirectoryError::Full));
        assert_eq!(dir.len(), 2);
    }

    #[test]
    fn last_seen_updates_in_place() {
        let dir = AddressDirectory::new(4);
        dir.add("a".into(), 1).unwrap();
        dir.update_last_seen("a", 7).unwrap();
        assert_eq!(dir.get("a").unwrap().last_seen, 7);
        assert_eq!(dir.update_last_seen("b", 1), Err(DirectoryError::NotFound));
    }

    #[test]
    fn version_marker_round_trips() {
        let dir = AddressDirectory::new(4);
        dir.add("a".into(), 1).unwrap();
        assert!(dir.sent_version("a").is_none());
        dir.mark_version_sent("a");
        assert!(dir.sent_version("a").is_some());
    }

    #[test]
    fn snapshot_is_the_wire_form() {
        let dir = AddressDirectory::new(4);
        dir.add("a".into(), 1).unwrap();
        dir.add("b".into(), 2).unwrap();
        let mut snapshot = dir.snapshot();
        snapshot.sort_by(|x, y| x.addr.cmp(&y.addr));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].addr, "a");
        assert_eq!(snapshot[1].last_seen, 2);
    }
}
