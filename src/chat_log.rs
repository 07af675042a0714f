use std::{fmt::Display, path::Path};

use chrono::{Local, NaiveDateTime};
use tokio::{
    fs::OpenOptions,
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tracing::{debug, error};

use crate::{channels::ReceiverWrapper, result::Result};

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: NaiveDateTime,
    pub text: String,
}

impl LogRecord {
    pub fn now(text: String) -> Self {
        LogRecord {
            timestamp: Local::now().naive_local(),
            text,
        }
    }
}

impl Display for LogRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.6f"),
            self.text
        )
    }
}

/// Handle to the append-only chat log. Clones share one writer task, so
/// lines from different sessions are never interleaved.
#[derive(Debug, Clone)]
pub struct ChatLog {
    sender: mpsc::UnboundedSender<LogRecord>,
}

impl ChatLog {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        Ok(Self::spawn(file))
    }

    pub fn spawn<W>(writer: W) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            run_writer(&mut receiver, writer).await;
        });

        ChatLog { sender }
    }

    pub fn append(&self, text: String) {
        if self.sender.send(LogRecord::now(text)).is_err() {
            error!("Chat log writer has stopped, record dropped");
        }
    }
}

pub async fn run_writer<R, W>(receiver: &mut R, mut writer: W)
where
    R: ReceiverWrapper<LogRecord>,
    W: AsyncWrite + Unpin,
{
    while let Some(record) = receiver.receive().await {
        let line = format!("{}\n", record);
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            error!("Error appending to chat log {:?}", e);
            continue;
        }

        if let Err(e) = writer.flush().await {
            error!("Error flushing chat log {:?}", e);
        }
    }

    debug!("Chat log writer finished");
}
