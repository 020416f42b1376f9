// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration module.
//!
//! Handles loading and saving transfer settings.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::obex::codec::PacketSizeParse;
use crate::obex::constants::sizes::{DEFAULT_BLOCK_SIZE, MAX_CLIENT_PACKET};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Bluetooth settings.
    #[serde(default)]
    pub bluetooth: BluetoothConfig,

    /// OBEX transfer settings.
    #[serde(default)]
    pub transfer: TransferConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// Adapter to use, e.g. "hci0". The default adapter when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter: Option<String>,

    /// Fixed RFCOMM channel. When unset the channel is resolved from the
    /// profile's service UUID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfcomm_channel: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// BODY bytes per PUT.
    pub block_size: usize,

    /// Maximum packet size offered in CONNECT.
    pub max_client_packet: u16,

    /// Time allowed to open the channel, in milliseconds; 0 disables it.
    pub connect_timeout_ms: u64,

    /// Per read/write timeout in milliseconds; 0 disables it.
    pub io_timeout_ms: u64,

    /// Read the negotiated packet size the way older clients did.
    pub legacy_packet_size_parse: bool,

    /// Keep going when a peer answers a PUT with "Length Required".
    pub tolerate_length_required: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            max_client_packet: MAX_CLIENT_PACKET,
            connect_timeout_ms: 30_000,
            io_timeout_ms: 10_000,
            legacy_packet_size_parse: false,
            tolerate_length_required: true,
        }
    }
}

impl TransferConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_ms > 0).then(|| Duration::from_millis(self.connect_timeout_ms))
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        (self.io_timeout_ms > 0).then(|| Duration::from_millis(self.io_timeout_ms))
    }

    pub fn packet_size_parse(&self) -> PacketSizeParse {
        if self.legacy_packet_size_parse {
            PacketSizeParse::Legacy
        } else {
            PacketSizeParse::Standard
        }
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("btpush")
        .join("config.toml")
}

impl Config {
    /// Load configuration from the default location, creating it if missing.
    pub fn load() -> Result<Self> {
        Self::load_from(&default_config_path())
    }

    /// Load configuration from `path`, writing defaults there if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
