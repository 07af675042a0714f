use std::{net::SocketAddr, sync::Arc, time::Duration};

use chrono::Utc;
use tokio::{
    io::{self, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    sync::mpsc,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    chat_log::ChatLog,
    client_sender::run_sender,
    context::{ReplySender, ServerContext, SessionHandle},
    handlers::{join::handle_join, quit::handle_quit},
    message_handler::{deliver, handle_line, Flow},
    message_parsing::parse_handshake,
    registry::NicknameRegistry,
    result::Result,
    settings::Framing,
};

/// Splits an inbound byte stream into messages according to the configured
/// framing.
pub struct FrameReader<R> {
    reader: BufReader<R>,
    framing: Framing,
    max_frame: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R, framing: Framing, buffer_size: usize) -> Self {
        FrameReader {
            reader: BufReader::with_capacity(buffer_size, inner),
            framing,
            max_frame: buffer_size,
        }
    }

    /// `Ok(None)` once the peer has closed its side.
    ///
    /// No frame is longer than the buffer size. In lines mode a longer line is
    /// handed out in buffer-sized pieces.
    pub async fn next_frame(&mut self) -> io::Result<Option<String>> {
        match self.framing {
            Framing::PerRead => {
                // fill_buf performs at most one read on the socket, whatever it
                // returned is one message
                let bytes = self.reader.fill_buf().await?;
                let bytes_read = bytes.len();
                if bytes_read == 0 {
                    return Ok(None);
                }

                let frame = String::from_utf8_lossy(bytes).into_owned();
                self.reader.consume(bytes_read);
                Ok(Some(frame))
            }
            Framing::Lines => {
                let mut line = Vec::new();
                let mut bounded = (&mut self.reader).take(self.max_frame as u64);
                if bounded.read_until(b'\n', &mut line).await? == 0 {
                    return Ok(None);
                }

                if line.last() == Some(&b'\n') {
                    line.pop();
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                }

                Ok(Some(String::from_utf8_lossy(&line).into_owned()))
            }
        }
    }

    pub async fn next_frame_within(
        &mut self,
        idle_timeout: Option<Duration>,
    ) -> io::Result<Option<String>> {
        let timeout = match idle_timeout {
            Some(t) => t,
            None => return self.next_frame().await,
        };

        match tokio::time::timeout(timeout, self.next_frame()).await {
            Ok(frame) => frame,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("nothing received for {} secs", timeout.as_secs()),
            )),
        }
    }
}

/// Runs one client connection from handshake to teardown. `read_half` and
/// `write_half` are the two directions of the client's socket.
pub async fn run_session<R, W>(
    read_half: R,
    mut write_half: W,
    client_host: Option<SocketAddr>,
    registry: Arc<NicknameRegistry>,
    log: ChatLog,
    context: Arc<ServerContext>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let connection_id = Uuid::new_v4();
    let mut frames = FrameReader::new(read_half, context.framing, context.read_buffer_size);

    let raw_nick = match frames.next_frame_within(context.idle_timeout).await? {
        Some(r) => r,
        None => {
            debug!("Connection {} closed before sending a nickname", connection_id);
            return Ok(());
        }
    };

    let requested = match parse_handshake(&raw_nick) {
        Ok(n) => n,
        Err(e) => {
            info!("Dropping connection {} from {:?}: {}", connection_id, client_host, e);
            return Ok(());
        }
    };

    let (sender, mut receiver) = mpsc::unbounded_channel();
    let framing = context.framing;
    let mut writer = tokio::spawn(async move {
        let result = run_sender(&mut receiver, &mut write_half, framing).await;
        if let Err(e) = write_half.shutdown().await {
            debug!("Error shutting down write half {:?}", e);
        }
        result
    });

    let mut session = SessionHandle::new(connection_id, client_host, ReplySender(sender));
    let nick = registry.register(&requested, session.clone());
    session.nickname = nick.clone();

    info!("{} connected from {:?} as {}", connection_id, session.client_host, nick);
    deliver(handle_join(&nick, &registry), &log);

    let mut writer_finished = false;
    loop {
        let frame = tokio::select! {
            frame = frames.next_frame_within(context.idle_timeout) => frame,
            result = &mut writer => {
                writer_finished = true;
                match result {
                    Ok(Err(e)) => warn!("Error writing to {}: {:?}", nick, e),
                    Err(e) => warn!("Writer task for {} failed: {:?}", nick, e),
                    Ok(Ok(())) => {}
                }
                break;
            }
        };

        match frame {
            Ok(Some(line)) => {
                if handle_line(&line, &session, &registry, &log) == Flow::Disconnect {
                    debug!("{} asked to leave", nick);
                    break;
                }
            }
            Ok(None) => {
                debug!("{} closed the connection", nick);
                break;
            }
            Err(e) => {
                warn!("Error reading from {}: {:?}", nick, e);
                break;
            }
        }
    }

    if let Some(delivery) = handle_quit(&nick, &registry) {
        deliver(delivery, &log);
    }

    let connected_for = Utc::now() - session.connected_at;

    // last sender gone, so the writer flushes what is queued and stops
    drop(session.sender);
    if !writer_finished {
        if let Err(e) = writer.await {
            warn!("Writer task for {} failed: {:?}", nick, e);
        }
    }

    info!(
        "{} ({}) from {:?} disconnected after {} secs",
        nick,
        connection_id,
        session.client_host,
        connected_for.num_seconds()
    );
    Ok(())
}
