// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Frames a single [`CallTask`] onto the wire.
//!
//! The encoder never owns a socket: it is handed a scratch buffer with a
//! caller-chosen amount of remaining space and either fills it or asks to be
//! retried once the buffer has been flushed. A connection has exactly one
//! writer (see [`crate::reactor::TokioReactor`]'s write loop), so this
//! buffer-pressure contract is negotiated against one sequential caller,
//! not concurrent ones — that single-writer discipline is what keeps frames
//! in submission order.

use bytes::BytesMut;
use tracing::warn;

use crate::{
    call::CallOutcome,
    codec::{
        router::Router,
        wire::{REQUEST_HEAD_SIZE, RequestHead},
    },
    connection::Connection,
};

/// Result of one encode attempt.
#[derive(Debug)]
pub enum EncodeOutcome {
    /// The frame was written; the value is the number of bytes appended.
    Written(usize),
    /// `body_size + REQUEST_HEAD_SIZE` would not fit in the remaining space;
    /// nothing was consumed and the caller should flush and retry.
    Retry,
}

pub struct Encoder;

impl Encoder {
    /// Encodes the request queued under `call_id` in `conn`'s in-flight map
    /// into `buf`, which has `remaining` bytes of headroom left in the
    /// caller's write chunk.
    ///
    /// For a fire-and-forget call, also removes the call id from the
    /// in-flight map and routes the caller's wake handle downstream: the
    /// server will never reply, so the caller is done the instant the bytes
    /// are written.
    pub fn encode(
        conn: &Connection,
        call_id: u64,
        router: &Router,
        buf: &mut BytesMut,
        remaining: usize,
    ) -> EncodeOutcome {
        let Some(task) = conn.in_flight_peek(call_id) else {
            warn!(call_id, "encoder asked to encode a call id not in the in-flight map");
            return EncodeOutcome::Written(0);
        };

        let body_size = task.request_body.len();
        if body_size + REQUEST_HEAD_SIZE > remaining {
            // Flushing gains nothing if the buffer is already empty — the
            // frame is simply bigger than one write chunk. Write it anyway
            // rather than asking the caller to retry forever.
            if !buf.is_empty() {
                return EncodeOutcome::Retry;
            }
        }

        let head = RequestHead {
            body_size: body_size as u32,
            service_id: task.service_id,
            method_index: task.method_index,
            call_id: task.call_id,
        };
        head.write_into(buf);
        buf.extend_from_slice(&task.request_body);
        let fire_and_forget = task.fire_and_forget;
        drop(task);

        if fire_and_forget {
            if let Some(task) = conn.in_flight_remove(call_id) {
                if router.route(task.completion, CallOutcome::NoResponse).is_err() {
                    warn!(call_id, "downstream resume queue closed; dropping fire-and-forget wakeup");
                }
            } else {
                warn!(call_id, "fire-and-forget task vanished from in-flight map before its wakeup could be routed");
            }
        }

        EncodeOutcome::Written(REQUEST_HEAD_SIZE + body_size)
    }
}
