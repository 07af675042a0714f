#[cfg(test)]
use std::{
    pin::Pin,
    task::{Context, Poll},
};

use tokio::io::{self, AsyncWrite, AsyncWriteExt};

use crate::{channels::ReceiverWrapper, settings::Framing};

/// Drains a session's outbound queue onto its socket until every sender is
/// gone or a write fails.
pub async fn run_sender<R, W>(receiver: &mut R, writer: &mut W, framing: Framing) -> io::Result<()>
where
    R: ReceiverWrapper<String>,
    W: AsyncWrite + Unpin,
{
    while let Some(payload) = receiver.receive().await {
        writer.write_all(payload.as_bytes()).await?;
        if framing == Framing::Lines {
            writer.write_all(b"\n").await?;
        }
        writer.flush().await?;
    }

    Ok(())
}

/// A socket whose peer has gone away: every write fails.
#[cfg(test)]
pub struct BrokenPipeWriter;

#[cfg(test)]
impl AsyncWrite for BrokenPipeWriter {
    fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, _: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away")))
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
