use tracing::debug;

use crate::{
    chat_log::ChatLog,
    context::SessionHandle,
    handlers::{broadcast::handle_broadcast, privmsg::handle_privmsg, Delivery},
    message_parsing::{parse_line, Command},
    registry::NicknameRegistry,
    replies::Reply,
};

#[derive(Debug, PartialEq)]
pub enum Flow {
    Continue,
    Disconnect,
}

/// Routes one inbound line from an active session.
pub fn handle_line(
    raw: &str,
    session: &SessionHandle,
    registry: &NicknameRegistry,
    log: &ChatLog,
) -> Flow {
    let command = match parse_line(raw) {
        Ok(Some(c)) => c,
        Ok(None) => return Flow::Continue,
        Err(e) => {
            debug!("Rejected line from {}: {}", session.nickname, e);
            if let Some(reply) = Reply::from_error(&e) {
                deliver(Delivery::to_one(&session.sender, reply), log);
            }
            return Flow::Continue;
        }
    };

    let delivery = match command {
        Command::Disconnect => return Flow::Disconnect,
        Command::Broadcast { body } => handle_broadcast(&session.nickname, &body, registry),
        Command::PrivateMessage { target, body } => {
            handle_privmsg(session, &target, &body, registry)
        }
    };

    deliver(delivery, log);
    Flow::Continue
}

/// Formats the reply once, queues it for every recipient and records it in
/// the chat log when it is a loggable event. A closed recipient is skipped.
pub fn deliver(delivery: Delivery, log: &ChatLog) {
    let payload = delivery.reply.to_string();

    for recipient in &delivery.recipients {
        if let Err(e) = recipient.send(payload.clone()) {
            debug!("Dropping reply for a closed session {:?}", e);
        }
    }

    if let Some(text) = delivery.reply.log_text() {
        log.append(text);
    }
}
