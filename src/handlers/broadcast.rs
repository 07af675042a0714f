use chrono::Local;

use crate::{registry::NicknameRegistry, replies::Reply};

use super::Delivery;

pub fn handle_broadcast(nick: &str, body: &str, registry: &NicknameRegistry) -> Delivery {
    let recipients = registry
        .snapshot_all()
        .into_iter()
        .map(|session| session.sender)
        .collect();

    Delivery {
        recipients,
        reply: Reply::Broadcast {
            sent_at: Local::now().time(),
            sender: nick.to_string(),
            body: body.to_string(),
        },
    }
}
