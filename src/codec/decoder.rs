// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Parses a response frame and resolves its [`CallTask`].
//!
//! The decoder never interprets the response body itself — it only ever
//! extracts the call id and hands the raw bytes back to the caller, who
//! owns the actual [`crate::codec::message::RpcMessage::decode`] call at the
//! point it unpacks its [`crate::call::CallOutcome`]. This keeps the engine
//! generic over whatever serialization format a service uses.

use bytes::Bytes;
use tracing::warn;

use crate::{call::CallOutcome, codec::router::Router, connection::Connection, error::ClientError};

pub struct Decoder;

impl Decoder {
    /// `call_id` and `body` come from an already-framed response (the
    /// reactor is responsible for reading exactly `body_size` bytes, as
    /// declared by the header, before calling this).
    ///
    /// Returns `Err` only for a protocol violation (unknown or duplicate
    /// call id); the connection itself is not torn down on that path, the
    /// caller just discards the frame.
    pub fn decode(
        conn: &Connection,
        call_id: u64,
        body: Bytes,
        router: &Router,
    ) -> Result<(), ClientError> {
        let Some(task) = conn.in_flight_remove(call_id) else {
            return Err(ClientError::Protocol(format!(
                "response for unknown or already-resolved call id {call_id}"
            )));
        };

        if router
            .route(task.completion, CallOutcome::Response(body))
            .is_err()
        {
            warn!(call_id, "downstream resume queue closed; dropping resolved response");
        }

        Ok(())
    }
}
