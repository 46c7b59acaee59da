//! The bound UDP endpoint of an active session, and the subnet fanout.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};

use tokio::{net::UdpSocket, sync::broadcast, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::events::{LobbyEvent, spawn_listener};
use crate::{
    Error, LobbyConfig, LocalIdentity, PeerRegistry, Result,
    message::{Action, ProtocolMessage},
    network,
};

/// Sends and receives lobby datagrams on a single socket.
#[derive(Debug)]
pub(crate) struct Announcer {
    socket: UdpSocket,
    identity: LocalIdentity,
    config: LobbyConfig,
    registry: Arc<PeerRegistry>,
}

impl Announcer {
    pub(crate) async fn bind(
        config: LobbyConfig,
        identity: LocalIdentity,
        registry: Arc<PeerRegistry>,
    ) -> Result<Self> {
        let addr = config.bind_addr();
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        Ok(Self {
            socket,
            identity,
            config,
            registry,
        })
    }

    pub(crate) fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    pub(crate) fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    pub(crate) async fn recv_from(&self, buf: &mut [u8]) -> std::io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf).await
    }

    /// Build the outbound message for `action` from current state.
    pub(crate) fn message(&self, action: Action) -> ProtocolMessage {
        let sender = self.identity.nickname.clone();
        match action {
            Action::PlayerList => ProtocolMessage::player_list(sender, self.registry.nicknames()),
            other => ProtocolMessage::new(sender, other),
        }
    }

    /// Send `action` to every candidate on the subnet, one datagram each.
    ///
    /// Candidates are recomputed from the current local address on every call.
    /// Failed sends are logged and skipped. Returns how many sends succeeded.
    pub(crate) async fn broadcast(&self, action: Action) -> Result<usize> {
        let local = self.config.local_address()?;
        let candidates = network::enumerate_candidates(local)?;
        let message = self.message(action);

        let sent = self.send_all(&message.encode(), &candidates).await;
        debug!(%message, sent, candidates = candidates.len(), "broadcast");
        Ok(sent)
    }

    /// Send `data` to each candidate on the lobby port, in order. A failure
    /// only skips that candidate.
    async fn send_all(&self, data: &[u8], candidates: &[Ipv4Addr]) -> usize {
        let mut sent = 0;
        for ip in candidates {
            let addr = SocketAddr::new(IpAddr::V4(*ip), self.config.port);
            match self.send_to(data, addr).await {
                Ok(()) => sent += 1,
                Err(e) => debug!(error = %e, "skipping candidate"),
            }
        }
        sent
    }

    async fn send_to(&self, data: &[u8], addr: SocketAddr) -> Result<()> {
        self.socket
            .send_to(data, addr)
            .await
            .map(|_| ())
            .map_err(|source| Error::Send { addr, source })
    }
}

/// An active lobby membership: the socket plus its receive loop.
pub(crate) struct Session {
    announcer: Arc<Announcer>,
    shutdown: CancellationToken,
    listener: Option<JoinHandle<()>>,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.listener.take() {
            handle.abort();
        }
    }
}

impl Session {
    /// Start receiving on an already bound announcer.
    pub(crate) fn start(announcer: Announcer, events: broadcast::Sender<LobbyEvent>) -> Self {
        let announcer = Arc::new(announcer);
        let shutdown = CancellationToken::new();
        let listener = spawn_listener(announcer.clone(), events, shutdown.clone());
        Self {
            announcer,
            shutdown,
            listener: Some(listener),
        }
    }

    pub(crate) fn identity(&self) -> &LocalIdentity {
        self.announcer.identity()
    }

    /// Broadcast and log instead of failing; used where a fanout error must
    /// not abort the surrounding transition.
    pub(crate) async fn announce(&self, action: Action) {
        if let Err(e) = self.announcer.broadcast(action).await {
            warn!(%action, error = %e, "broadcast failed");
        }
    }

    /// Stop the receive loop and release the socket.
    pub(crate) async fn close(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.listener.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "listener task ended abnormally");
            }
        }
        info!(nickname = %self.identity().nickname, "session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const LOBBY_IP: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);
    const PEER_IP: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 2);
    /// Documentation range, never routable from a loopback-bound socket.
    const UNREACHABLE_IP: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);

    async fn loopback_announcer(port: u16) -> Result<Announcer> {
        let config = LobbyConfig::default()
            .with_port(port)
            .with_bind_address(LOBBY_IP)
            .with_local_address(LOBBY_IP);
        let identity = LocalIdentity {
            nickname: "alice".into(),
            local_address: LOBBY_IP,
        };
        Announcer::bind(config, identity, Arc::new(PeerRegistry::new())).await
    }

    #[tokio::test]
    async fn failed_send_does_not_stop_fanout() {
        let peer = UdpSocket::bind((PEER_IP, 0)).await.unwrap();
        let port = peer.local_addr().unwrap().port();
        let announcer = loopback_announcer(port).await.unwrap();

        let data = announcer.message(Action::Join).encode();
        let sent = announcer.send_all(&data, &[UNREACHABLE_IP, PEER_IP]).await;
        assert_eq!(sent, 1);

        let mut buf = [0u8; 64];
        let (len, from) = tokio::time::timeout(Duration::from_secs(2), peer.recv_from(&mut buf))
            .await
            .expect("peer should receive the datagram")
            .unwrap();
        assert_eq!(&buf[..len], b"alice|JOIN");
        assert_eq!(from.ip(), IpAddr::V4(LOBBY_IP));
    }
}
