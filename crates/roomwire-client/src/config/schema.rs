use serde::Deserialize;
use roomwire_core::error::{ChannelError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub version: u32,

    pub channel: ChannelSection,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ChannelError::BadConfig(format!(
                "unsupported config version: {}",
                self.version
            )));
        }
        self.channel.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelSection {
    pub url: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,

    #[serde(default)]
    pub reconnect: ReconnectSection,
}

impl ChannelSection {
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(ChannelError::BadConfig(
                "channel.url must start with ws:// or wss://".into(),
            ));
        }
        if !(500..=60000).contains(&self.connect_timeout_ms) {
            return Err(ChannelError::BadConfig(
                "channel.connect_timeout_ms must be between 500 and 60000".into(),
            ));
        }
        if !(1000..=120000).contains(&self.ping_interval_ms) {
            return Err(ChannelError::BadConfig(
                "channel.ping_interval_ms must be between 1000 and 120000".into(),
            ));
        }
        if self.outbound_queue == 0 {
            return Err(ChannelError::BadConfig(
                "channel.outbound_queue must be at least 1".into(),
            ));
        }
        self.reconnect.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconnectSection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for ReconnectSection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl ReconnectSection {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts > 20 {
            return Err(ChannelError::BadConfig(
                "reconnect.max_attempts must be at most 20".into(),
            ));
        }
        if !(100..=30000).contains(&self.base_delay_ms) {
            return Err(ChannelError::BadConfig(
                "reconnect.base_delay_ms must be between 100 and 30000".into(),
            ));
        }
        Ok(())
    }
}

fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_ping_interval_ms() -> u64 {
    30000
}
fn default_outbound_queue() -> usize {
    64
}
fn default_max_attempts() -> u32 {
    5
}
fn default_base_delay_ms() -> u64 {
    1000
}
