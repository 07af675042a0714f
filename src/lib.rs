pub mod channels;
pub mod chat_log;
pub mod client_listener;
pub mod client_sender;
pub mod context;
pub mod error;
pub mod handlers;
pub mod message_handler;
pub mod message_parsing;
pub mod registry;
pub mod relay;
pub mod replies;
pub mod result;
pub mod server;
pub mod settings;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Unable to listen for shutdown signal {:?}", e);
        // never resolve, keep serving
        std::future::pending::<()>().await;
    }
}
