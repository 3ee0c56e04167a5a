use serde::Deserialize;

use roomlink_core::{Result, RoomLinkError};

use crate::caps::{IceConfig, IceServer, MediaConstraints};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub version: u32,

    pub relay: RelaySection,

    #[serde(default)]
    pub ice: IceSection,

    #[serde(default)]
    pub media: MediaSection,

    /// Chat identity stamped into outgoing `send_message` payloads.
    #[serde(default = "default_identity")]
    pub identity: String,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RoomLinkError::Config("unsupported config version".into()));
        }
        self.relay.validate()?;
        for s in &self.ice.servers {
            if s.urls.is_empty() {
                return Err(RoomLinkError::Config("ice server urls must not be empty".into()));
            }
        }
        if self.identity.is_empty() {
            return Err(RoomLinkError::Config("identity must not be empty".into()));
        }
        Ok(())
    }

    pub fn ice_config(&self) -> IceConfig {
        IceConfig {
            servers: self
                .ice
                .servers
                .iter()
                .map(|s| IceServer {
                    urls: s.urls.clone(),
                    username: s.username.clone(),
                    credential: s.credential.clone(),
                })
                .collect(),
        }
    }

    pub fn media_constraints(&self) -> MediaConstraints {
        MediaConstraints {
            audio: self.media.audio,
            video: self.media.video,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelaySection {
    /// Signaling endpoint, e.g. `ws://localhost:8080/ws`. The room id is
    /// appended as a query parameter on connect.
    pub url: String,

    /// Fixed reconnect backoff (no jitter, no retry cap).
    #[serde(default = "default_reconnect_backoff_ms")]
    pub reconnect_backoff_ms: u64,
}

impl RelaySection {
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(RoomLinkError::Config(
                "relay.url must start with ws:// or wss://".into(),
            ));
        }
        if self.url.contains('?') {
            return Err(RoomLinkError::Config(
                "relay.url must not carry a query string".into(),
            ));
        }
        if !(100..=60000).contains(&self.reconnect_backoff_ms) {
            return Err(RoomLinkError::Config(
                "relay.reconnect_backoff_ms must be between 100 and 60000".into(),
            ));
        }
        Ok(())
    }
}

fn default_reconnect_backoff_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IceSection {
    #[serde(default)]
    pub servers: Vec<IceServerConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IceServerConfig {
    pub urls: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MediaSection {
    #[serde(default = "default_true")]
    pub audio: bool,
    #[serde(default = "default_true")]
    pub video: bool,
}

impl Default for MediaSection {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_identity() -> String {
    "user1".into()
}
