// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{
    call::{CallOutcome, CallTask, Controller},
    cfg::config::{Config, RuntimeConfig},
    channel::Channel,
    client::common::connect_with_timeout,
    codec::{message::RpcMessage, router::Router},
    connection::{self, ConnState, Connection, ConnectionEvent},
    error::ClientError,
    method::MethodDescriptor,
    reactor::{Reactor, TokioReactor},
    utils::resolve_host,
};

/// The engine's public façade: owns a registry of [`Channel`]s and the three
/// long-lived tasks (connection worker, upstream dispatch, downstream
/// resume) that drive every call submitted through it.
///
/// The channel registry is load-bearing, not a convenience cache: a
/// `Channel` owns its slots' round-robin cursor and connection state, so two
/// `Channel`s pointed at the same `(host, port)` would fragment pooling and
/// double the connection count for no reason. `register_channel` always
/// returns the same `Arc<Channel>` for a given endpoint.
pub struct Client {
    channels: DashMap<(String, u16), Arc<Channel>>,
    connect_tx: mpsc::UnboundedSender<ConnectionEvent>,
    upstream_tx: mpsc::UnboundedSender<CallTask>,
    next_call_id: AtomicU64,
    runtime: RuntimeConfig,
}

impl Client {
    /// Builds a `Client` from a loaded [`Config`], registers every configured
    /// channel, and spawns the connection worker, upstream dispatch, and
    /// downstream resume tasks, using the default Tokio-backed [`TokioReactor`].
    pub fn new(config: Config) -> Arc<Self> {
        Self::with_reactor(config, |max_response_body, write_chunk_size, connect_tx, router| {
            Arc::new(TokioReactor::new(max_response_body, write_chunk_size, connect_tx, router))
        })
    }

    /// Like [`Client::new`], but lets a host plug in its own [`Reactor`]
    /// instead of the shipped Tokio-backed default — the seam the spec
    /// describes as an external collaborator (§1, §6). `build_reactor` is
    /// handed `(max_response_body, write_chunk_size, connect_tx, router)` so
    /// a custom reactor can still post `Close` events back to the connection
    /// worker and route resolved outcomes to the downstream resume task.
    pub fn with_reactor(
        config: Config,
        build_reactor: impl FnOnce(usize, usize, mpsc::UnboundedSender<ConnectionEvent>, Router) -> Arc<dyn Reactor>,
    ) -> Arc<Self> {
        let (connect_tx, connect_rx) = mpsc::unbounded_channel::<ConnectionEvent>();
        let (upstream_tx, upstream_rx) = mpsc::unbounded_channel::<CallTask>();
        let (downstream_tx, downstream_rx) = mpsc::unbounded_channel();
        let router = Router::new(downstream_tx);

        let reactor: Arc<dyn Reactor> = build_reactor(
            config.runtime.max_response_body,
            config.runtime.write_chunk_size,
            connect_tx.clone(),
            router.clone(),
        );

        let channels = DashMap::new();
        for ch in &config.channels {
            let channel = Channel::new(ch.host.clone(), ch.port, ch.connect_num, connect_tx.clone());
            channels.insert((ch.host.clone(), ch.port), channel);
        }

        let client = Arc::new(Self {
            channels,
            connect_tx,
            upstream_tx,
            next_call_id: AtomicU64::new(1),
            runtime: config.runtime,
        });

        tokio::spawn(connection_worker(connect_rx, router.clone(), reactor.clone(), client.runtime.clone()));
        tokio::spawn(upstream_dispatch(upstream_rx, router.clone(), reactor));
        tokio::spawn(downstream_resume(downstream_rx));

        client
    }

    /// Returns the channel registered for `(host, port)`, registering a new
    /// one with `connect_num` slots if none exists yet.
    pub fn register_channel(&self, host: impl Into<String>, port: u16, connect_num: usize) -> Arc<Channel> {
        let host = host.into();
        self.channels
            .entry((host.clone(), port))
            .or_insert_with(|| Channel::new(host, port, connect_num, self.connect_tx.clone()))
            .clone()
    }

    /// Looks up an already-registered channel without creating one.
    pub fn channel(&self, host: &str, port: u16) -> Option<Arc<Channel>> {
        self.channels.get(&(host.to_string(), port)).map(|e| e.clone())
    }

    /// Submits a call and awaits its outcome.
    ///
    /// Returns `Err` for a call-level failure — the caller's controller is
    /// consulted for the human-readable reason, mirroring a generated RPC
    /// stub that checks `controller->Failed()` after the call returns.
    /// `Ok(CallOutcome::Failed)` is never produced: that case is always
    /// translated into `Err` here.
    pub async fn call(
        &self,
        channel: &Arc<Channel>,
        method: MethodDescriptor,
        request_body: Bytes,
    ) -> Result<CallOutcome, ClientError> {
        let call_id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
        let controller = Controller::new();
        let (completion, rx) = oneshot::channel();

        let task = CallTask {
            call_id,
            service_id: method.service_id,
            method_index: method.method_index,
            fire_and_forget: method.fire_and_forget,
            request_body,
            channel: channel.clone(),
            controller: controller.clone(),
            completion,
        };

        self.upstream_tx.send(task).map_err(|_| ClientError::ShuttingDown)?;

        let outcome = rx.await.map_err(|_| ClientError::ShuttingDown)?;
        match outcome {
            CallOutcome::Failed => Err(ClientError::Transport(controller.error_text())),
            other => Ok(other),
        }
    }

    /// Convenience wrapper around [`Client::call`] that encodes `request` and
    /// decodes the response through [`RpcMessage`], deferring to the caller
    /// whatever serialization format the service actually uses. Returns
    /// `Ok(None)` for a fire-and-forget method.
    pub async fn call_typed<Req, Resp>(
        &self,
        channel: &Arc<Channel>,
        method: MethodDescriptor,
        request: &Req,
    ) -> Result<Option<Resp>, ClientError>
    where
        Req: RpcMessage,
        Resp: RpcMessage,
    {
        let mut buf = BytesMut::with_capacity(request.encoded_len());
        request.encode_into(&mut buf)?;

        match self.call(channel, method, buf.freeze()).await? {
            CallOutcome::Response(body) => Ok(Some(Resp::decode(&body)?)),
            CallOutcome::NoResponse => Ok(None),
            CallOutcome::Failed => Err(ClientError::Protocol(
                "call() must translate Failed into Err before reaching call_typed".to_string(),
            )),
        }
    }
}

/// Drains submitted calls, routing each to its channel's next connection
/// slot: straight to the in-flight map and the reactor if already Connected,
/// onto the pending list otherwise.
async fn upstream_dispatch(
    mut upstream_rx: mpsc::UnboundedReceiver<CallTask>,
    router: Router,
    reactor: Arc<dyn Reactor>,
) {
    while let Some(task) = upstream_rx.recv().await {
        let conn = task.channel.pick_next().await;
        match conn.state() {
            ConnState::Connected => {
                let call_id = task.call_id;
                conn.in_flight_insert(task);
                reactor.send(conn, call_id);
            },
            ConnState::Connecting => conn.pending_push(task),
            ConnState::Closed => {
                // pick_next never hands back a Closed connection.
                warn!(call_id = task.call_id, "picked connection unexpectedly Closed, failing call");
                connection::fail_task(task, "connection unexpectedly closed", &router);
            },
        }
    }
}

/// Completes each queued wake handle. Kept as its own task so the reader and
/// writer paths never resolve a caller's oneshot inline.
async fn downstream_resume(mut downstream_rx: mpsc::UnboundedReceiver<crate::codec::router::WakeItem>) {
    while let Some(item) = downstream_rx.recv().await {
        let _ = item.completion.send(item.outcome);
    }
}

/// Owns every connect/close transition. One task for the whole client: it
/// never blocks on a single connect attempt, spawning a dedicated task per
/// event instead, so a slow dial on one channel cannot delay a close on
/// another.
async fn connection_worker(
    mut connect_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
    router: Router,
    reactor: Arc<dyn Reactor>,
    runtime: RuntimeConfig,
) {
    while let Some(event) = connect_rx.recv().await {
        match event {
            ConnectionEvent::Connect(conn) => {
                tokio::spawn(handle_connect(conn, router.clone(), reactor.clone(), runtime.clone()));
            },
            ConnectionEvent::Close(conn) => {
                tokio::spawn(handle_close(conn, router.clone()));
            },
        }
    }
}

async fn handle_connect(conn: Arc<Connection>, router: Router, reactor: Arc<dyn Reactor>, runtime: RuntimeConfig) {
    let Some(channel) = conn.channel.upgrade() else {
        debug!("channel dropped before its pending connect could run");
        return;
    };

    if channel.connect_delay() {
        tokio::time::sleep(runtime.reconnect_delay).await;
    }

    let host = resolve_host(&channel.host);
    match connect_with_timeout(&host, channel.port, runtime.connect_timeout).await {
        Ok(stream) => {
            if let Err(e) = stream.set_nodelay(true) {
                warn!(host = %channel.host, port = channel.port, error = %e, "failed to set TCP_NODELAY");
            }
            let (read_half, write_half) = stream.into_split();

            conn.set_state(ConnState::Connected);
            channel.set_connect_delay(false);
            info!(host = %channel.host, port = channel.port, "connected");

            // Installs this connection's write queue before anything is
            // enqueued onto it, so the pending-list drain below lands in the
            // same FIFO writer the queue's single consumer drains.
            reactor.add_connection(conn.clone(), read_half, write_half);

            for task in conn.pending_take_all() {
                let call_id = task.call_id;
                conn.in_flight_insert(task);
                reactor.send(conn.clone(), call_id);
            }
        },
        Err(e) => {
            warn!(host = %channel.host, port = channel.port, error = %e, "connect failed");
            channel.set_connect_delay(true);
            conn.set_state(ConnState::Closed);
            for task in conn.pending_take_all() {
                connection::fail_task(task, ClientError::ConnectFail.to_string(), &router);
            }
        },
    }
}

async fn handle_close(conn: Arc<Connection>, router: Router) {
    conn.cancel.cancel();
    conn.install_write_queue(None);

    if let Some(channel) = conn.channel.upgrade() {
        channel.set_connect_delay(true);
    }
    conn.set_state(ConnState::Closed);

    for task in conn.in_flight_drain() {
        connection::fail_task(task, ClientError::enetdown_text(), &router);
    }
    // A task can land on the pending list after the connect that would have
    // drained it has already failed, if the failure raced the push; fail
    // those too rather than leaving them stranded forever.
    for task in conn.pending_take_all() {
        connection::fail_task(task, ClientError::enetdown_text(), &router);
    }
}
