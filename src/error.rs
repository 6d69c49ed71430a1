// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

/// Linux `ENETDOWN`. Rendered through [`std::io::Error::from_raw_os_error`] so
/// the text matches the platform's own `strerror` rather than a hand-rolled
/// string.
const ENETDOWN: i32 = 100;

/// Failure taxonomy for the engine's own operation, as distinct from failures
/// surfaced to a caller only through a [`crate::call::Controller`].
///
/// Every variant here is either raised synchronously at setup time
/// (`Configuration`) or used internally to build the text handed to a
/// `Controller` (`Transport`, `Protocol`, ...). The engine never lets one of
/// these cross the caller boundary as an `Err` for an ordinary RPC failure —
/// see the propagation policy in the crate docs.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The non-blocking connect attempt failed, timed out, or was refused.
    #[error("Connect fail")]
    ConnectFail,

    /// The connection was alive and dropped: peer close, read error, or
    /// write error.
    #[error("{0}")]
    Transport(String),

    /// The decoder could not make sense of an inbound frame: an unknown or
    /// duplicate call id, or a frame whose body exceeds the configured
    /// maximum.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Rejected at config-load time: an empty channel list, a zero port, a
    /// write-chunk size smaller than one frame head, or similar
    /// misconfiguration. Registering the same `(host, port)` twice is not
    /// one of these — see `Client::register_channel`.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// `RpcMessage::encode_into` failed for a request body.
    #[error("encode error: {0}")]
    Encode(String),

    /// `RpcMessage::decode` failed for a response body.
    #[error("decode error: {0}")]
    Decode(String),

    /// The client's upstream/downstream tasks have already exited (the
    /// `Client` is being torn down).
    #[error("engine shut down")]
    ShuttingDown,
}

impl ClientError {
    /// The text a `Controller` reports for a dropped connection, matching
    /// the source's `strerror(ENETDOWN)`.
    pub fn enetdown_text() -> String {
        std::io::Error::from_raw_os_error(ENETDOWN).to_string()
    }
}
