use chrono::NaiveTime;
use std::fmt::Display;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Joined {
        nick: String,
    },
    Left {
        nick: String,
    },
    Broadcast {
        sent_at: NaiveTime,
        sender: String,
        body: String,
    },
    PrivateMessage {
        sent_at: NaiveTime,
        sender: String,
        target: String,
        body: String,
    },
    UserOffline {
        target: String,
    },
    ErrPmUsage,
    ErrInvalidPrivateMessage,
}

impl Reply {
    /// Text for the chat log, if this reply is something the log records.
    pub fn log_text(&self) -> Option<String> {
        match self {
            Reply::Joined { nick } => Some(format!("{} joined", nick)),
            Reply::Broadcast { .. } | Reply::PrivateMessage { .. } => Some(self.to_string()),
            _ => None,
        }
    }

    pub fn from_error(error: &Error) -> Option<Reply> {
        match error {
            Error::PmUsage => Some(Reply::ErrPmUsage),
            Error::InvalidPrivateMessage => Some(Reply::ErrInvalidPrivateMessage),
            _ => None,
        }
    }
}

impl Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::Joined { nick } => write!(f, "*** {} joined the chat ***", nick),
            Reply::Left { nick } => write!(f, "*** {} left the chat ***", nick),
            Reply::Broadcast {
                sent_at,
                sender,
                body,
            } => write!(f, "[{}] {}: {}", sent_at.format("%H:%M:%S"), sender, body),
            Reply::PrivateMessage {
                sent_at,
                sender,
                target,
                body,
            } => write!(
                f,
                "[{}] (PM) {} \u{2192} {}: {}",
                sent_at.format("%H:%M:%S"),
                sender,
                target,
                body
            ),
            Reply::UserOffline { target } => write!(f, "User '{}' is offline.", target),
            Reply::ErrPmUsage => write!(f, "{}", Error::PmUsage),
            Reply::ErrInvalidPrivateMessage => write!(f, "{}", Error::InvalidPrivateMessage),
        }
    }
}
