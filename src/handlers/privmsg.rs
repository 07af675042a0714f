use chrono::Local;

use crate::{context::SessionHandle, registry::NicknameRegistry, replies::Reply};

use super::Delivery;

/// Delivers to the target and echoes back to the sender. An unknown target
/// only gets the sender an offline notice.
pub fn handle_privmsg(
    sender: &SessionHandle,
    target: &str,
    body: &str,
    registry: &NicknameRegistry,
) -> Delivery {
    let target_session = match registry.lookup(target) {
        Some(s) => s,
        None => {
            return Delivery::to_one(
                &sender.sender,
                Reply::UserOffline {
                    target: target.to_string(),
                },
            );
        }
    };

    Delivery {
        recipients: vec![target_session.sender, sender.sender.clone()],
        reply: Reply::PrivateMessage {
            sent_at: Local::now().time(),
            sender: sender.nickname.clone(),
            target: target.to_string(),
            body: body.to_string(),
        },
    }
}
