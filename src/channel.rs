// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A logical RPC endpoint: `(host, port, N connections)` plus the
//! round-robin picker that spreads calls across its connection slots.

use std::sync::{
    Arc, Weak,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use tokio::sync::{RwLock, mpsc};
use tracing::debug;

use crate::connection::{ConnState, Connection, ConnectionEvent};

/// One endpoint and its fixed-size pool of connection slots.
///
/// The round-robin cursor is incremented unconditionally on every pick,
/// including the pick that creates a slot's first connection — so the first
/// submission against a fresh channel lands on slot `1 % N`, not slot `0`.
/// This matches the upstream implementation's observable behaviour; nothing
/// in the fan-out property depends on which slot goes first, only that load
/// is spread round-robin over time, so it is kept rather than "fixed".
pub struct Channel {
    pub host: String,
    pub port: u16,
    slots: Vec<RwLock<Arc<Connection>>>,
    cursor: AtomicUsize,
    /// Set after any connect failure or transport close on this channel;
    /// cleared on the next successful connect. Dampens tight reconnect
    /// loops by making the connection worker sleep 1s before the next dial.
    pub(crate) connect_delay: AtomicBool,
    pub(crate) connect_tx: mpsc::UnboundedSender<ConnectionEvent>,
}

impl Channel {
    pub(crate) fn new(
        host: impl Into<String>,
        port: u16,
        connect_num: usize,
        connect_tx: mpsc::UnboundedSender<ConnectionEvent>,
    ) -> Arc<Self> {
        let connect_num = connect_num.max(1);
        Arc::new_cyclic(|weak: &Weak<Channel>| {
            let slots = (0..connect_num)
                .map(|_| RwLock::new(Connection::new(weak.clone())))
                .collect();
            Self {
                host: host.into(),
                port,
                slots,
                cursor: AtomicUsize::new(0),
                connect_delay: AtomicBool::new(false),
                connect_tx,
            }
        })
    }

    pub fn connection_count(&self) -> usize {
        self.slots.len()
    }

    pub fn connect_delay(&self) -> bool {
        self.connect_delay.load(Ordering::Acquire)
    }

    pub(crate) fn set_connect_delay(&self, v: bool) {
        self.connect_delay.store(v, Ordering::Release);
    }

    /// Round-robin pick. If the chosen slot is Closed, a fresh `Connection`
    /// is installed, transitioned to Connecting, and a `Connect` event is
    /// posted to the connection worker before it is returned — `pick_next`
    /// never hands back a Closed connection.
    pub async fn pick_next(self: &Arc<Self>) -> Arc<Connection> {
        let idx = (self.cursor.fetch_add(1, Ordering::Relaxed) + 1) % self.slots.len();
        let mut slot = self.slots[idx].write().await;

        if slot.state() == ConnState::Closed {
            let fresh = Connection::new(Arc::downgrade(self));
            fresh.set_state(ConnState::Connecting);
            debug!(host = %self.host, port = self.port, slot = idx, "connecting");
            let _ = self.connect_tx.send(ConnectionEvent::Connect(fresh.clone()));
            *slot = fresh;
        }

        slot.clone()
    }
}
