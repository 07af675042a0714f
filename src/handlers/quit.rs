use tracing::debug;

use crate::{registry::NicknameRegistry, replies::Reply};

use super::Delivery;

/// Removes `nick` and tells the remaining sessions. Returns `None` when the
/// nick was already gone, so the leave notice goes out at most once.
pub fn handle_quit(nick: &str, registry: &NicknameRegistry) -> Option<Delivery> {
    let removed = registry.unregister(nick)?;
    debug!(
        "Removed {} ({}), {} sessions remaining",
        nick,
        removed.connection_id,
        registry.len()
    );

    Some(Delivery {
        recipients: registry
            .snapshot_all()
            .into_iter()
            .map(|session| session.sender)
            .collect(),
        reply: Reply::Left {
            nick: nick.to_string(),
        },
    })
}
