use std::{
    collections::HashMap,
    fmt::Display,
    net::Ipv4Addr,
    ops::{Deref, DerefMut},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use serde::Serialize;
use tokio::time::Instant;

/// A lobby member, keyed by nickname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub nickname: String,
    /// When this peer was first seen. Never refreshed.
    pub joined_at: Instant,
}

impl Peer {
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            joined_at: Instant::now(),
        }
    }

    pub fn online_for(&self) -> Duration {
        self.joined_at.elapsed()
    }
}

impl Display for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.nickname)
    }
}

/// Who we are for the duration of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
    pub nickname: String,
    pub local_address: Ipv4Addr,
}

/// Point-in-time view of a peer for presentation.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PeerSnapshot {
    pub nickname: String,
    pub online_secs: u64,
}

impl Display for PeerSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (online: {}:{:02})",
            self.nickname,
            self.online_secs / 60,
            self.online_secs % 60
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerMap(HashMap<String, Peer>);

impl PeerMap {
    /// Peers ordered by first-seen time, ties broken by nickname.
    fn ordered(&self) -> Vec<&Peer> {
        let mut peers: Vec<&Peer> = self.0.values().collect();
        peers.sort_by(|a, b| {
            a.joined_at
                .cmp(&b.joined_at)
                .then_with(|| a.nickname.cmp(&b.nickname))
        });
        peers
    }
}

impl Deref for PeerMap {
    type Target = HashMap<String, Peer>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for PeerMap {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Display for PeerMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for peer in self.ordered() {
            writeln!(f, "'{}' ({}s)", peer, peer.online_for().as_secs())?;
        }
        Ok(())
    }
}

/// Shared membership table.
///
/// Every access takes the lock, so a snapshot never sees a half-applied change
/// and concurrent upserts of the same nickname leave exactly one entry.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: Mutex<PeerMap>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PeerMap> {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `nickname` with the current time. Returns `false` and keeps the
    /// original timestamp if it is already present.
    pub fn upsert(&self, nickname: &str) -> bool {
        let mut peers = self.lock();
        if peers.contains_key(nickname) {
            return false;
        }
        peers.insert(nickname.to_string(), Peer::new(nickname));
        true
    }

    /// Returns `true` if the nickname was present.
    pub fn remove(&self, nickname: &str) -> bool {
        self.lock().remove(nickname).is_some()
    }

    pub fn contains(&self, nickname: &str) -> bool {
        self.lock().contains_key(nickname)
    }

    pub fn snapshot(&self) -> Vec<PeerSnapshot> {
        self.lock()
            .ordered()
            .into_iter()
            .map(|peer| PeerSnapshot {
                nickname: peer.nickname.clone(),
                online_secs: peer.online_for().as_secs(),
            })
            .collect()
    }

    /// Known nicknames in snapshot order.
    pub fn nicknames(&self) -> Vec<String> {
        self.lock()
            .ordered()
            .into_iter()
            .map(|peer| peer.nickname.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Copy of the underlying map.
    pub fn peers(&self) -> PeerMap {
        self.lock().clone()
    }
}
