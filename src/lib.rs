//! Serverless presence lobby for a local network.
//!
//! Every participant sends small `|`-delimited UDP datagrams to each address
//! of its /24 subnet, merges the nickname lists it hears back, and keeps a
//! shared view of who is online.

mod config;
mod error;
mod lobby;
pub mod message;
pub mod network;
mod peer;

pub use config::{DEFAULT_BOOTSTRAP_DELAY, DEFAULT_PORT, LobbyConfig};
pub use error::{Error, Result};
pub use lobby::{Lobby, LobbyEvent};
pub use message::{Action, DecodeError, ProtocolMessage};
pub use peer::{LocalIdentity, Peer, PeerMap, PeerRegistry, PeerSnapshot};
