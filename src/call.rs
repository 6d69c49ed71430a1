// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The unit of in-flight work: one outstanding call, from the moment a
//! caller hands a request to a [`crate::channel::Channel`] until it is
//! resumed with a result.

use std::sync::Mutex;

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::channel::Channel;
use std::sync::Arc;

/// User-visible failure reporter, mirroring the `Controller` a generated
/// stub passes alongside a request and response.
///
/// A `Controller` is written at most once, by the engine, before the call
/// completes; `reset` lets a caller recycle one across repeated calls.
#[derive(Debug, Default)]
pub struct Controller {
    inner: Mutex<ControllerState>,
}

#[derive(Debug, Default, Clone)]
struct ControllerState {
    failed: bool,
    error_text: String,
}

impl Controller {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failed(&self, text: impl Into<String>) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.failed = true;
        state.error_text = text.into();
    }

    pub fn failed(&self) -> bool {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).failed
    }

    pub fn error_text(&self) -> String {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).error_text.clone()
    }

    pub fn reset(&self) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.failed = false;
        state.error_text.clear();
    }
}

/// What a completed call resolved to. Delivered to the caller's
/// [`oneshot::Receiver`] exactly once, in every terminal case.
#[derive(Debug)]
pub enum CallOutcome {
    /// A response frame was demultiplexed for this call id.
    Response(Bytes),
    /// The call was fire-and-forget; the request is on the wire.
    NoResponse,
    /// The call did not complete; `controller` on the matching [`CallTask`]
    /// already carries the reason.
    Failed,
}

/// One outstanding call, queued on a [`Channel`] and eventually handed to a
/// connection's in-flight map.
///
/// `request_body` is already encoded by the time a `CallTask` exists: the
/// generic [`crate::codec::RpcMessage`] layer only runs at the edges (when a
/// caller builds a request and when it reads a response back), so the
/// engine itself only ever moves bytes around.
pub struct CallTask {
    pub call_id: u64,
    pub service_id: u32,
    pub method_index: u32,
    pub fire_and_forget: bool,
    pub request_body: Bytes,
    pub channel: Arc<Channel>,
    pub controller: Arc<Controller>,
    pub(crate) completion: oneshot::Sender<CallOutcome>,
}


impl std::fmt::Debug for CallTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallTask")
            .field("call_id", &self.call_id)
            .field("service_id", &self.service_id)
            .field("method_index", &self.method_index)
            .field("fire_and_forget", &self.fire_and_forget)
            .field("body_len", &self.request_body.len())
            .finish()
    }
}
