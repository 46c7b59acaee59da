use std::{net::SocketAddr, sync::Arc};

use tokio::{sync::broadcast, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::session::Announcer;
use crate::{
    PeerRegistry,
    message::{Action, ProtocolMessage},
};

/// Largest payload a single UDP datagram can carry.
const MAX_DATAGRAM: usize = 65_507;

/// Membership changes, published for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyEvent {
    PeerJoined { nickname: String },
    PeerLeft { nickname: String },
}

/// What handling one message changed, and what to send back.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Outcome {
    pub(crate) reply: Option<Action>,
    pub(crate) events: Vec<LobbyEvent>,
}

pub(crate) fn publish(events: &broadcast::Sender<LobbyEvent>, event: LobbyEvent) {
    // No subscribers is fine.
    let _ = events.send(event);
}

/// Receive until `shutdown` fires. Bad datagrams and socket errors are logged
/// and skipped.
pub(crate) fn spawn_listener(
    announcer: Arc<Announcer>,
    events: broadcast::Sender<LobbyEvent>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(nickname = %announcer.identity().nickname, "listening for peers");
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                received = announcer.recv_from(&mut buf) => match received {
                    Ok((len, from)) => {
                        handle_datagram(&announcer, &events, &buf[..len], from).await
                    }
                    Err(e) => warn!(error = %e, "receive failed"),
                },
            }
        }
        info!(nickname = %announcer.identity().nickname, "listener stopped");
    })
}

async fn handle_datagram(
    announcer: &Announcer,
    events: &broadcast::Sender<LobbyEvent>,
    data: &[u8],
    from: SocketAddr,
) {
    let message = match ProtocolMessage::decode(data) {
        Ok(message) => message,
        Err(e) => {
            debug!(%from, error = %e, "discarding datagram");
            return;
        }
    };
    debug!(%from, %message, "received");

    let outcome = apply_message(announcer.registry(), &message);
    for event in outcome.events {
        publish(events, event);
    }
    if let Some(action) = outcome.reply {
        if let Err(e) = announcer.broadcast(action).await {
            warn!(%action, error = %e, "reply broadcast failed");
        }
    }
}

/// Apply a received message to the registry.
pub(crate) fn apply_message(registry: &PeerRegistry, message: &ProtocolMessage) -> Outcome {
    let mut outcome = Outcome::default();
    match message.action {
        Action::Join => {
            if registry.upsert(&message.sender) {
                outcome.events.push(LobbyEvent::PeerJoined {
                    nickname: message.sender.clone(),
                });
                outcome.reply = Some(Action::PlayerList);
            }
        }
        Action::Leave => {
            if registry.remove(&message.sender) {
                outcome.events.push(LobbyEvent::PeerLeft {
                    nickname: message.sender.clone(),
                });
            }
        }
        Action::RequestPlayers => outcome.reply = Some(Action::PlayerList),
        Action::PlayerList => {
            for nickname in &message.payload {
                if registry.upsert(nickname) {
                    outcome.events.push(LobbyEvent::PeerJoined {
                        nickname: nickname.clone(),
                    });
                }
            }
        }
    }
    outcome
}
