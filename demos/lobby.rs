//! # LAN lobby example
//!
//! Join the lobby on the local network and watch who is online.
//!
//! ```sh
//! cargo run --example lobby -- alice
//! ```
//!
//! The peer list is printed once a second. Press Ctrl-C to leave.

use std::{net::Ipv4Addr, time::Duration};

use anyhow::Result;
use clap::Parser;
use lan_lobby::{DEFAULT_PORT, Lobby, LobbyConfig, LobbyEvent};
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Nickname shown to other peers
    nickname: String,
    /// UDP port shared by every peer
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Use this address instead of detecting one
    #[arg(long)]
    local_address: Option<Ipv4Addr>,
    /// Print the peer list as JSON
    #[arg(long)]
    json: bool,
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = LobbyConfig::default().with_port(cli.port);
    if let Some(address) = cli.local_address {
        config = config.with_local_address(address);
    }
    let lobby = Lobby::new(config);
    println!("Your IP: {}", lobby.current_local_address()?);

    let mut events = lobby.subscribe();
    lobby.join(&cli.nickname).await?;
    println!("Connected to the lobby as '{}'.", cli.nickname);

    let mut refresh = tokio::time::interval(Duration::from_secs(1));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            event = events.recv() => match event {
                Ok(LobbyEvent::PeerJoined { nickname }) => println!("+ {nickname}"),
                Ok(LobbyEvent::PeerLeft { nickname }) => println!("- {nickname}"),
                Err(RecvError::Lagged(missed)) => eprintln!("missed {missed} lobby events"),
                Err(RecvError::Closed) => break,
            },
            _ = refresh.tick() => {
                let peers = lobby.peer_snapshot();
                if cli.json {
                    println!("{}", serde_json::to_string(&peers)?);
                } else {
                    println!("--- {} online ---", peers.len());
                    for peer in peers {
                        println!("{peer}");
                    }
                }
            }
        }
    }

    println!("Leaving...");
    lobby.leave().await;
    Ok(())
}
