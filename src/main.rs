use std::sync::Arc;

use relay_chat::{
    chat_log::ChatLog, context::ServerContext, registry::NicknameRegistry, result::Result,
    server, settings::Settings,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    relay_chat::init_tracing();

    let settings = Settings::new()?;
    let context = Arc::new(ServerContext::new(&settings.server, settings.read_buffer_size));
    info!(
        "Starting chat server, framing {:?}, chat log {}",
        context.framing, settings.server.log_path
    );

    let log = ChatLog::open(&settings.server.log_path).await?;
    let listener = server::bind(&settings.server.address()).await?;

    server::run_server(
        listener,
        context,
        Arc::new(NicknameRegistry::new()),
        log,
        relay_chat::shutdown_signal(),
    )
    .await
}
