use std::io;

use config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Handshake rejected, no nickname given")]
    HandshakeRejected,

    // The next two are sent verbatim to the client
    #[error("Usage: /pm username message")]
    PmUsage,

    #[error("Invalid private message format. Use @username: message")]
    InvalidPrivateMessage,

    #[error("Unable to reach upstream server {addr}: {source}")]
    UpstreamUnreachable { addr: String, source: io::Error },
}
