// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Per-socket state: the 3-state connection machine, the pending-send list,
//! and the in-flight call table that demultiplexes responses back to their
//! callers.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex, Weak,
        atomic::{AtomicU8, Ordering},
    },
};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{call::CallTask, channel::Channel};

/// The three states a [`Connection`] cycles through, per §4.5 of the engine
/// design: at most one connect in flight per slot, and the in-flight map is
/// only ever non-empty while Connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Closed,
    Connecting,
    Connected,
}

impl ConnState {
    fn to_u8(self) -> u8 {
        match self {
            ConnState::Closed => 0,
            ConnState::Connecting => 1,
            ConnState::Connected => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => ConnState::Closed,
            1 => ConnState::Connecting,
            _ => ConnState::Connected,
        }
    }
}

/// One TCP socket to one endpoint, owned by a slot in a [`Channel`].
///
/// The in-flight map is a [`DashMap`] rather than a single
/// `Mutex<HashMap<..>>` — the same sharded-locking idiom this codebase
/// already reaches for elsewhere (see the session connection maps), and it
/// satisfies the "mutated only under its mutex" invariant since every bucket
/// is itself mutex-guarded.
pub struct Connection {
    state: AtomicU8,
    in_flight: DashMap<u64, CallTask>,
    /// FIFO of tasks submitted while this slot is Connecting. Plain
    /// `std::sync::Mutex` because critical sections here never await —
    /// pushes and drains are synchronous Vec/VecDeque operations.
    pending: Mutex<VecDeque<CallTask>>,
    /// FIFO queue of call ids handed to [`crate::reactor::Reactor::send`],
    /// consumed by exactly one writer task for this connection's lifetime —
    /// this is what makes write order match submission order (§5): a single
    /// consumer draining a FIFO channel cannot reorder what it reads.
    /// `None` before the connection has an installed writer, or after close.
    write_tx: Mutex<Option<mpsc::UnboundedSender<u64>>>,
    pub(crate) channel: Weak<Channel>,
    /// Cancelled when this connection transitions to Closed, to stop its
    /// reader task promptly.
    pub(crate) cancel: CancellationToken,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state())
            .field("in_flight_len", &self.in_flight.len())
            .finish()
    }
}

/// Events posted to the connection worker task. Carries the connection
/// itself rather than a slot index so the worker never needs to re-resolve
/// which channel/slot it came from beyond `Connection::channel`.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    Connect(Arc<Connection>),
    Close(Arc<Connection>),
}

impl Connection {
    pub fn new(channel: Weak<Channel>) -> Arc<Self> {
        Arc::new(Self {
            state: AtomicU8::new(ConnState::Closed.to_u8()),
            in_flight: DashMap::new(),
            pending: Mutex::new(VecDeque::new()),
            write_tx: Mutex::new(None),
            channel,
            cancel: CancellationToken::new(),
        })
    }

    pub fn state(&self) -> ConnState {
        ConnState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, s: ConnState) {
        self.state.store(s.to_u8(), Ordering::Release);
    }

    pub fn in_flight_insert(&self, task: CallTask) {
        self.in_flight.insert(task.call_id, task);
    }

    pub fn in_flight_remove(&self, call_id: u64) -> Option<CallTask> {
        self.in_flight.remove(&call_id).map(|(_, t)| t)
    }

    pub fn in_flight_peek(
        &self,
        call_id: u64,
    ) -> Option<dashmap::mapref::one::Ref<'_, u64, CallTask>> {
        self.in_flight.get(&call_id)
    }

    pub fn in_flight_is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Drains every in-flight task. Used by close handling, which fails each
    /// one with an `ENETDOWN`-flavoured error before resuming its caller.
    pub fn in_flight_drain(&self) -> Vec<CallTask> {
        let ids: Vec<u64> = self.in_flight.iter().map(|e| *e.key()).collect();
        ids.into_iter()
            .filter_map(|id| self.in_flight.remove(&id).map(|(_, t)| t))
            .collect()
    }

    pub fn pending_push(&self, task: CallTask) {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).push_back(task);
    }

    pub fn pending_is_empty(&self) -> bool {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }

    /// Swaps out the whole pending list, leaving it empty. Used on connect
    /// success (tasks move to the in-flight map, FIFO) and on connect
    /// failure (tasks are failed in submission order).
    pub fn pending_take_all(&self) -> VecDeque<CallTask> {
        std::mem::take(&mut self.pending.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Installs the per-connection write queue on a successful connect, or
    /// clears it (`None`) when the connection closes, so a `send()` racing a
    /// close fails loudly instead of silently enqueueing into nothing.
    pub(crate) fn install_write_queue(&self, tx: Option<mpsc::UnboundedSender<u64>>) {
        *self.write_tx.lock().unwrap_or_else(|e| e.into_inner()) = tx;
    }

    /// Clones out the write queue sender, if one is installed.
    pub(crate) fn write_queue(&self) -> Option<mpsc::UnboundedSender<u64>> {
        self.write_tx.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Fails `task` with `text` and routes its caller's wake handle downstream.
/// Shared by the pending-list failure path (connect failure) and the
/// in-flight drain path (transport close) — the only difference between the
/// two is the failure text and which container the task came from.
pub(crate) fn fail_task(task: CallTask, text: impl Into<String>, router: &crate::codec::router::Router) {
    use crate::call::CallOutcome;

    let call_id = task.call_id;
    task.controller.set_failed(text);
    if router.route(task.completion, CallOutcome::Failed).is_err() {
        tracing::warn!(call_id, "downstream resume queue closed; dropping failure wakeup");
    }
}
