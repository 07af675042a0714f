use crate::{registry::NicknameRegistry, replies::Reply};

use super::Delivery;

/// Announces `nick` to everyone registered, the newcomer included.
pub fn handle_join(nick: &str, registry: &NicknameRegistry) -> Delivery {
    Delivery {
        recipients: registry
            .snapshot_all()
            .into_iter()
            .map(|session| session.sender)
            .collect(),
        reply: Reply::Joined {
            nick: nick.to_string(),
        },
    }
}
