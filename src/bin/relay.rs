use relay_chat::{relay, result::Result, settings::Settings};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    relay_chat::init_tracing();

    let settings = Settings::new()?;
    let upstream = settings.relay.upstream_address();
    info!("Relaying to chat server at {}", upstream);

    let listener = relay::bind(&settings.relay.address()).await?;
    relay::run_relay(
        listener,
        upstream,
        settings.read_buffer_size,
        relay_chat::shutdown_signal(),
    )
    .await
}
