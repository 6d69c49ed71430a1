// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::codec::wire::REQUEST_HEAD_SIZE;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// One entry per logical RPC endpoint this client will register.
    pub channels: Vec<ChannelConfig>,
    /// Implementation/runtime parameters that apply to every channel.
    pub runtime: RuntimeConfig,
}

/// `(host, port, connection pool size)` for one [`crate::channel::Channel`].
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ChannelConfig {
    /// Empty, `"0"`, `"0.0.0.0"` or `"*"` all mean "any local address",
    /// resolved the same way [`crate::utils::resolve_host`] does for dialing.
    pub host: String,
    pub port: u16,
    #[serde(default = "default_connect_num")]
    pub connect_num: usize,
}

fn default_connect_num() -> usize {
    1
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RuntimeConfig {
    /// Deadline for one non-blocking connect attempt, including its
    /// `SO_ERROR` poll.
    #[serde(rename = "ConnectTimeout", with = "serde_secs")]
    pub connect_timeout: Duration,

    /// Sleep applied before a channel's next connect attempt after any
    /// connect failure or transport close, to avoid a tight reconnect loop.
    #[serde(rename = "ReconnectDelay", with = "serde_secs")]
    pub reconnect_delay: Duration,

    /// Size of the scratch buffer the reactor fills before flushing a
    /// socket write. Must be large enough to hold at least one frame head.
    #[serde(rename = "WriteChunkSize")]
    pub write_chunk_size: usize,

    /// Upper bound on a response body size; larger frames close the
    /// connection rather than allocate unbounded memory for an attacker- or
    /// bug-controlled length prefix.
    #[serde(rename = "MaxResponseBody")]
    pub max_response_body: usize,
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: Config = serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants that the rest of the engine assumes hold.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(!self.channels.is_empty(), "at least one channel must be configured");

        for ch in &mut self.channels {
            if ch.connect_num == 0 {
                ch.connect_num = 1;
            }
            ensure!(ch.port != 0, "channel port must be non-zero (host {:?})", ch.host);
        }

        ensure!(
            self.runtime.write_chunk_size >= REQUEST_HEAD_SIZE,
            "WriteChunkSize must be at least {REQUEST_HEAD_SIZE} bytes (one frame head)"
        );
        ensure!(self.runtime.max_response_body > 0, "MaxResponseBody must be > 0");
        ensure!(
            !self.runtime.connect_timeout.is_zero(),
            "ConnectTimeout must be > 0"
        );

        Ok(())
    }
}


/// Serde helper for representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
