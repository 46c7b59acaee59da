use std::net::SocketAddr;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No usable local IPv4 address found.")]
    NoLocalAddress,
    #[error("Nickname must not be empty.")]
    EmptyNickname,
    #[error("Nickname must not contain '{0}'.")]
    ReservedCharacter(char),
    #[error("Already joined the lobby.")]
    AlreadyActive,
    #[error("Not joined to a lobby.")]
    NotActive,
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to send to {addr}: {source}")]
    Send {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Subnet(#[from] ipnetwork::IpNetworkError),
}
