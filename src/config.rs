use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use crate::{Result, network};

/// Well-known UDP port of the lobby protocol.
pub const DEFAULT_PORT: u16 = 5000;
/// Pause between the bootstrap broadcasts after joining.
pub const DEFAULT_BOOTSTRAP_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyConfig {
    /// Port we listen on and send to.
    pub port: u16,
    /// Address the UDP socket binds to.
    pub bind_address: IpAddr,
    /// Use this address instead of detecting one. Not checked for usability.
    pub local_address: Option<Ipv4Addr>,
    /// Wait between `JOIN` and `REQUEST_PLAYERS`.
    pub request_delay: Duration,
    /// Wait between `REQUEST_PLAYERS` and the closing `PLAYER_LIST`.
    pub announce_delay: Duration,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            local_address: None,
            request_delay: DEFAULT_BOOTSTRAP_DELAY,
            announce_delay: DEFAULT_BOOTSTRAP_DELAY,
        }
    }
}

impl LobbyConfig {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_bind_address(mut self, bind_address: impl Into<IpAddr>) -> Self {
        self.bind_address = bind_address.into();
        self
    }

    pub fn with_local_address(mut self, local_address: Ipv4Addr) -> Self {
        self.local_address = Some(local_address);
        self
    }

    pub fn with_bootstrap_delays(mut self, request: Duration, announce: Duration) -> Self {
        self.request_delay = request;
        self.announce_delay = announce;
        self
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// The configured override, or the detected host address.
    pub fn local_address(&self) -> Result<Ipv4Addr> {
        match self.local_address {
            Some(address) => Ok(address),
            None => network::local_ipv4(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_convention() {
        let config = LobbyConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.bind_addr(), "0.0.0.0:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.request_delay, Duration::from_millis(500));
        assert_eq!(config.announce_delay, Duration::from_millis(500));
    }

    #[test]
    fn override_wins_over_detection() {
        let config = LobbyConfig::default()
            .with_port(6000)
            .with_bind_address(Ipv4Addr::LOCALHOST)
            .with_local_address(Ipv4Addr::LOCALHOST);
        assert_eq!(config.local_address().unwrap(), Ipv4Addr::LOCALHOST);
        assert_eq!(config.bind_addr(), "127.0.0.1:6000".parse::<SocketAddr>().unwrap());
    }
}
