//! Wire format: `sender|ACTION[|nickname]*` as UTF-8 text.

use std::{fmt::Display, str::FromStr};

use bytes::Bytes;
use thiserror::Error;

use crate::{Error, Result};

/// Field separator. Reserved, nicknames may not contain it.
pub const SEPARATOR: char = '|';

#[derive(Error, PartialEq, Eq, Debug)]
pub enum DecodeError {
    #[error("malformed message, expected at least sender and action")]
    Malformed,
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("message is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Join,
    Leave,
    RequestPlayers,
    PlayerList,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Join => "JOIN",
            Action::Leave => "LEAVE",
            Action::RequestPlayers => "REQUEST_PLAYERS",
            Action::PlayerList => "PLAYER_LIST",
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "JOIN" => Ok(Action::Join),
            "LEAVE" => Ok(Action::Leave),
            "REQUEST_PLAYERS" => Ok(Action::RequestPlayers),
            "PLAYER_LIST" => Ok(Action::PlayerList),
            other => Err(DecodeError::UnknownAction(other.to_string())),
        }
    }
}

/// A single datagram of the lobby protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolMessage {
    pub sender: String,
    pub action: Action,
    /// Known nicknames, only carried by [`Action::PlayerList`].
    pub payload: Vec<String>,
}

impl ProtocolMessage {
    pub fn new(sender: impl Into<String>, action: Action) -> Self {
        Self {
            sender: sender.into(),
            action,
            payload: Vec::new(),
        }
    }

    pub fn player_list(sender: impl Into<String>, players: Vec<String>) -> Self {
        Self {
            sender: sender.into(),
            action: Action::PlayerList,
            payload: players,
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut text = format!("{}{SEPARATOR}{}", self.sender, self.action);
        if self.action == Action::PlayerList {
            for nickname in &self.payload {
                text.push(SEPARATOR);
                text.push_str(nickname);
            }
        }
        Bytes::from(text)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
        let mut fields = text.split(SEPARATOR);
        let (Some(sender), Some(action)) = (fields.next(), fields.next()) else {
            return Err(DecodeError::Malformed);
        };
        if sender.is_empty() {
            return Err(DecodeError::Malformed);
        }
        let action: Action = action.parse()?;
        let payload = match action {
            Action::PlayerList => fields
                .filter(|nickname| !nickname.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };
        Ok(Self {
            sender: sender.to_string(),
            action,
            payload,
        })
    }
}

impl Display for ProtocolMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.sender, self.action)?;
        if self.action == Action::PlayerList {
            for nickname in &self.payload {
                write!(f, "{SEPARATOR}{nickname}")?;
            }
        }
        Ok(())
    }
}

/// Trim user input and make sure it can be carried on the wire.
pub fn validate_nickname(nickname: &str) -> Result<String> {
    let nickname = nickname.trim();
    if nickname.is_empty() {
        return Err(Error::EmptyNickname);
    }
    if nickname.contains(SEPARATOR) {
        return Err(Error::ReservedCharacter(SEPARATOR));
    }
    Ok(nickname.to_string())
}
