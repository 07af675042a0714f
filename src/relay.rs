use std::future::Future;

use tokio::{
    io::{self, AsyncReadExt, AsyncWriteExt},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpListener, TcpStream,
    },
};
use tracing::{debug, info, warn};

use crate::{error::Error, message_parsing::RELAY_MARKER, result::Result};

/// Prefixes the relay marker unless the handshake already carries it.
pub fn mark_handshake(handshake: &[u8]) -> Vec<u8> {
    let mut buf = [0u8; 4];
    let marker = RELAY_MARKER.encode_utf8(&mut buf).as_bytes();

    if handshake.starts_with(marker) {
        return handshake.to_vec();
    }

    let mut marked = Vec::with_capacity(marker.len() + handshake.len());
    marked.extend_from_slice(marker);
    marked.extend_from_slice(handshake);
    marked
}

pub async fn bind(address: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(address).await?;
    info!("Relay listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Accepts clients until `shutdown` resolves and pairs each of them with a
/// fresh connection to `upstream`.
pub async fn run_relay<F>(
    listener: TcpListener,
    upstream: String,
    buffer_size: usize,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = &mut shutdown => {
                info!("Relay shutting down");
                return Ok(());
            }
        };

        let (client, addr) = match accepted {
            Ok(a) => a,
            Err(e) => {
                warn!("Error accepting relay connection {:?}", e);
                continue;
            }
        };

        info!("New relay connection from {}", addr);
        let upstream = upstream.clone();
        tokio::spawn(async move {
            match handle_relay(client, &upstream, buffer_size).await {
                Ok(()) => debug!("Relay link for {} closed", addr),
                Err(e) => warn!("Relay link for {} failed: {}", addr, e),
            }
        });
    }
}

/// Relays one client. Whichever direction stops first tears down both
/// connections.
pub async fn handle_relay(client: TcpStream, upstream: &str, buffer_size: usize) -> Result<()> {
    let server = match TcpStream::connect(upstream).await {
        Ok(s) => s,
        Err(source) => {
            return Err(Error::UpstreamUnreachable {
                addr: upstream.to_string(),
                source,
            })
        }
    };

    let (mut client_read, client_write) = client.into_split();
    let (server_read, mut server_write) = server.into_split();

    let mut buf = vec![0u8; buffer_size];
    let n = client_read.read(&mut buf).await?;
    if n == 0 {
        debug!("Relay client closed before the handshake");
        return Ok(());
    }
    server_write.write_all(&mark_handshake(&buf[..n])).await?;

    let mut to_server = tokio::spawn(forward(client_read, server_write, buffer_size));
    let mut to_client = tokio::spawn(forward(server_read, client_write, buffer_size));

    let (finished, other) = tokio::select! {
        r = &mut to_server => (r, to_client),
        r = &mut to_client => (r, to_server),
    };

    other.abort();
    if let Err(e) = other.await {
        if !e.is_cancelled() {
            warn!("Relay forwarding task failed {:?}", e);
        }
    }

    match finished {
        Ok(Ok(bytes)) => {
            debug!("Relay direction finished after {} bytes", bytes);
            Ok(())
        }
        Ok(Err(e)) => Err(e.into()),
        Err(e) => {
            warn!("Relay forwarding task failed {:?}", e);
            Ok(())
        }
    }
}

async fn forward(
    mut src: OwnedReadHalf,
    mut dest: OwnedWriteHalf,
    buffer_size: usize,
) -> io::Result<u64> {
    let mut buf = vec![0u8; buffer_size];
    let mut total = 0u64;

    loop {
        let n = src.read(&mut buf).await?;
        if n == 0 {
            return Ok(total);
        }
        dest.write_all(&buf[..n]).await?;
        total += n as u64;
    }
}
