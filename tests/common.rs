#![allow(dead_code)]

use std::{
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

use anyhow::{Context, Result};
use lan_lobby::{Lobby, LobbyConfig};
use tokio::{net::UdpSocket, time::timeout};

/// Where the lobby under test lives.
pub const LOBBY_IP: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);
/// Where the scripted remote peer lives. Inside the lobby's candidate range.
pub const PEER_IP: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 2);

const WAIT: Duration = Duration::from_secs(2);

/// Lobby config confined to loopback, with short bootstrap delays.
pub fn loopback_config(local: Ipv4Addr, port: u16) -> LobbyConfig {
    LobbyConfig::default()
        .with_port(port)
        .with_bind_address(local)
        .with_local_address(local)
        .with_bootstrap_delays(Duration::from_millis(50), Duration::from_millis(50))
}

/// A raw socket standing in for a remote peer. Its port is the lobby port for
/// the test.
pub struct FakePeer {
    pub socket: UdpSocket,
    pub port: u16,
}

impl FakePeer {
    pub async fn bind() -> Result<Self> {
        let socket = UdpSocket::bind((PEER_IP, 0)).await?;
        let port = socket.local_addr()?.port();
        Ok(Self { socket, port })
    }

    pub fn lobby_addr(&self) -> SocketAddr {
        SocketAddr::from((LOBBY_IP, self.port))
    }

    pub fn config(&self) -> LobbyConfig {
        loopback_config(LOBBY_IP, self.port)
    }

    pub async fn send(&self, text: &str) -> Result<()> {
        self.socket.send_to(text.as_bytes(), self.lobby_addr()).await?;
        Ok(())
    }

    pub async fn recv(&self) -> Result<String> {
        let mut buf = vec![0u8; 2048];
        let (len, _) = timeout(WAIT, self.socket.recv_from(&mut buf))
            .await
            .context("timed out waiting for a datagram")??;
        Ok(String::from_utf8(buf[..len].to_vec())?)
    }

    /// Fail if anything arrives within `quiet`.
    pub async fn expect_silence(&self, quiet: Duration) -> Result<()> {
        let mut buf = vec![0u8; 2048];
        match timeout(quiet, self.socket.recv_from(&mut buf)).await {
            Err(_) => Ok(()),
            Ok(received) => {
                let (len, _) = received?;
                anyhow::bail!(
                    "unexpected datagram: {}",
                    String::from_utf8_lossy(&buf[..len])
                )
            }
        }
    }

    /// Read datagrams until `expected` arrives, returning what came before it.
    pub async fn recv_until(&self, expected: &str) -> Result<Vec<String>> {
        let mut skipped = Vec::new();
        loop {
            let text = self.recv().await?;
            if text == expected {
                return Ok(skipped);
            }
            println!("skipping datagram: {text}");
            skipped.push(text);
        }
    }

    /// Join `lobby` as `nickname` and consume its bootstrap broadcasts.
    pub async fn join_and_drain(&self, lobby: &Lobby, nickname: &str) -> Result<()> {
        lobby.join(nickname).await?;
        self.recv_until(&format!("{nickname}|PLAYER_LIST|{nickname}"))
            .await?;
        Ok(())
    }
}

/// Find a UDP port that is free on [`PEER_IP`].
pub async fn free_port() -> Result<u16> {
    let probe = UdpSocket::bind((PEER_IP, 0)).await?;
    Ok(probe.local_addr()?.port())
}

/// Poll the lobby's registry until it holds exactly `expected`, in any order.
pub async fn await_peers(lobby: &Lobby, expected: &[&str]) -> Result<()> {
    let mut expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    expected.sort();
    let registry = lobby.registry();
    timeout(WAIT, async {
        loop {
            let mut names = registry.nicknames();
            names.sort();
            if names == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .with_context(|| format!("registry never became {expected:?}: {}", registry.peers()))
}

pub fn nicknames(lobby: &Lobby) -> Vec<String> {
    lobby
        .peer_snapshot()
        .into_iter()
        .map(|peer| peer.nickname)
        .collect()
}
