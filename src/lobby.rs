//! Lobby membership engine

mod events;
mod session;

use std::{net::Ipv4Addr, sync::Arc};

use tokio::{
    sync::{Mutex, broadcast},
    time::sleep,
};
use tracing::{debug, info};

use crate::{
    Error, LobbyConfig, LocalIdentity, PeerRegistry, PeerSnapshot, Result,
    message::{Action, validate_nickname},
};
use events::publish;
use session::{Announcer, Session};

pub use events::LobbyEvent;

/// Buffered membership events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 64;

/// A participant in the local lobby.
///
/// Idle until [`Lobby::join`] succeeds, active until [`Lobby::leave`].
pub struct Lobby {
    config: LobbyConfig,
    /// Membership, shared with whoever renders it.
    registry: Arc<PeerRegistry>,
    events: broadcast::Sender<LobbyEvent>,
    /// `Some` while active. Held for the whole of a join or leave.
    session: Mutex<Option<Session>>,
}

impl Default for Lobby {
    fn default() -> Self {
        Self::new(LobbyConfig::default())
    }
}

impl Lobby {
    pub fn new(config: LobbyConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            registry: Arc::new(PeerRegistry::new()),
            events,
            session: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    /// Handle to the membership table, for the presentation side.
    pub fn registry(&self) -> Arc<PeerRegistry> {
        self.registry.clone()
    }

    /// Receive membership changes as they are applied.
    pub fn subscribe(&self) -> broadcast::Receiver<LobbyEvent> {
        self.events.subscribe()
    }

    /// Current peers with how long each has been online.
    pub fn peer_snapshot(&self) -> Vec<PeerSnapshot> {
        self.registry.snapshot()
    }

    pub fn current_local_address(&self) -> Result<Ipv4Addr> {
        self.config.local_address()
    }

    pub async fn is_active(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Who we joined as.
    pub async fn identity(&self) -> Result<LocalIdentity> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| session.identity().clone())
            .ok_or(Error::NotActive)
    }

    /// Join the lobby as `nickname`.
    ///
    /// Binds the UDP port, registers ourselves, starts listening and runs the
    /// bootstrap: `JOIN`, then `REQUEST_PLAYERS` and `PLAYER_LIST` after the
    /// configured delays. Peers normally answer the request with their own
    /// lists; the closing `PLAYER_LIST` announces us again in case they did not.
    pub async fn join(&self, nickname: &str) -> Result<()> {
        let mut slot = self.session.lock().await;
        if slot.is_some() {
            return Err(Error::AlreadyActive);
        }
        let nickname = validate_nickname(nickname)?;

        let local_address = self.config.local_address()?;
        let identity = LocalIdentity {
            nickname: nickname.clone(),
            local_address,
        };
        let announcer =
            Announcer::bind(self.config.clone(), identity, self.registry.clone()).await?;

        if self.registry.upsert(&nickname) {
            publish(
                &self.events,
                LobbyEvent::PeerJoined {
                    nickname: nickname.clone(),
                },
            );
        }
        let session = Session::start(announcer, self.events.clone());
        info!(%nickname, %local_address, port = self.config.port, "joined lobby");

        session.announce(Action::Join).await;
        sleep(self.config.request_delay).await;
        session.announce(Action::RequestPlayers).await;
        sleep(self.config.announce_delay).await;
        session.announce(Action::PlayerList).await;
        debug!(peers = self.registry.len(), "bootstrap finished");

        *slot = Some(session);
        Ok(())
    }

    /// Announce that we are leaving and stop listening. Does nothing if idle.
    pub async fn leave(&self) {
        let mut slot = self.session.lock().await;
        let Some(session) = slot.take() else {
            debug!("leave requested while idle");
            return;
        };

        session.announce(Action::Leave).await;
        session.close().await;

        for nickname in self.registry.nicknames() {
            self.registry.remove(&nickname);
            publish(&self.events, LobbyEvent::PeerLeft { nickname });
        }
        info!("left lobby");
    }
}
