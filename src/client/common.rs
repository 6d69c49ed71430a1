// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use tokio::net::TcpStream;

use crate::error::ClientError;

/// Dials `host:port`, failing with [`ClientError::ConnectFail`] if the
/// attempt (including DNS resolution) does not complete within `timeout`.
pub(super) async fn connect_with_timeout(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<TcpStream, ClientError> {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(ClientError::Transport(e.to_string())),
        Err(_) => Err(ClientError::ConnectFail),
    }
}
