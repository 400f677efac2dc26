mod addresses;
mod client;
mod error;
mod peers;

pub use addresses::{AddressDirectory, AddressEntry};
pub use client::{Client, RPC_TIMEOUT};
pub use error::DirectoryError;
pub use peers::{PeerDirectory, PeerRecord};
