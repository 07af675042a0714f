use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde_derive::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// Every socket read is one message, nothing is appended on write.
    PerRead,
    /// Messages are newline terminated in both directions.
    Lines,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub log_path: String,
    pub framing: Framing,
    #[serde(default)]
    pub idle_timeout_secs: Option<u64>,
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelaySettings {
    pub host: String,
    pub port: u16,
    pub upstream_host: String,
    pub upstream_port: u16,
}

impl RelaySettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn upstream_address(&self) -> String {
        format!("{}:{}", self.upstream_host, self.upstream_port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub relay: RelaySettings,
    pub read_buffer_size: usize,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let mut s = Config::new();

        s.set_default("server.host", "127.0.0.1")?;
        s.set_default("server.port", 12345_i64)?;
        s.set_default("server.log_path", "chat_log.txt")?;
        s.set_default("server.framing", "per_read")?;
        s.set_default("relay.host", "127.0.0.1")?;
        s.set_default("relay.port", 23456_i64)?;
        s.set_default("relay.upstream_host", "127.0.0.1")?;
        s.set_default("relay.upstream_port", 12345_i64)?;
        s.set_default("read_buffer_size", 1024_i64)?;

        s.merge(File::with_name("Settings").required(false))?;
        s.merge(Environment::with_prefix("CHAT").separator("__"))?;
        s.try_into()
    }
}
