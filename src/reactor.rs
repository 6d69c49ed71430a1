// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The generic I/O reactor contract the engine calls into, plus one
//! concrete, Tokio-backed implementation so the crate is runnable
//! standalone. A host may supply its own [`Reactor`] instead.

use std::sync::Arc;

use bytes::BytesMut;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::tcp::{OwnedReadHalf, OwnedWriteHalf},
    sync::mpsc,
};
use tracing::warn;

use crate::{
    codec::{
        decoder::Decoder,
        encoder::{EncodeOutcome, Encoder},
        pipeline::{Pipeline, PipelineFactory},
        router::Router,
        wire::{RESPONSE_HEAD_SIZE, ResponseHead},
    },
    connection::{Connection, ConnectionEvent},
};

/// Registers connected sockets and hands queued calls off for encoding.
///
/// This is the seam the spec treats as an external collaborator: a host
/// embedding this engine may swap in its own poller/sender instead of
/// [`TokioReactor`].
pub trait Reactor: Send + Sync {
    /// Takes ownership of both socket halves and spawns whatever drives this
    /// connection's inbound and outbound paths: frames read off `read_half`
    /// are fed to the decoder until the peer closes or a transport error
    /// occurs, and calls handed to [`Reactor::send`] are written to
    /// `write_half` in the order they were submitted.
    fn add_connection(&self, conn: Arc<Connection>, read_half: OwnedReadHalf, write_half: OwnedWriteHalf);

    /// Hands the call queued under `call_id` in `conn`'s in-flight map off
    /// for encoding and writing, preserving the order calls are submitted
    /// relative to every other call on the same connection.
    fn send(&self, conn: Arc<Connection>, call_id: u64);
}

/// Default reactor: one Tokio task per connection owns the read half and
/// feeds frames to the [`Decoder`]; a second, single Tokio task per
/// connection owns the write half and drains a FIFO queue of call ids
/// populated by [`Reactor::send`], so frames are flushed in exactly the
/// order [`Reactor::send`] was called — the single-writer discipline §5
/// requires.
pub struct TokioReactor {
    pipeline_factory: PipelineFactory,
    write_chunk_size: usize,
    close_tx: mpsc::UnboundedSender<ConnectionEvent>,
}

impl TokioReactor {
    pub fn new(
        max_response_body: usize,
        write_chunk_size: usize,
        close_tx: mpsc::UnboundedSender<ConnectionEvent>,
        router: Router,
    ) -> Self {
        Self { pipeline_factory: PipelineFactory::new(max_response_body, router), write_chunk_size, close_tx }
    }

    async fn read_loop(
        conn: Arc<Connection>,
        mut read_half: OwnedReadHalf,
        pipeline: Pipeline,
        close_tx: mpsc::UnboundedSender<ConnectionEvent>,
    ) {
        let cancel = conn.cancel.clone();
        let result: std::io::Result<()> = tokio::select! {
            _ = cancel.cancelled() => Ok(()),
            r = Self::read_frames(&conn, &mut read_half, &pipeline) => r,
        };
        if let Err(e) = result {
            warn!(error = %e, "connection read loop ended");
        }
        let _ = close_tx.send(ConnectionEvent::Close(conn));
    }

    async fn read_frames(
        conn: &Arc<Connection>,
        read_half: &mut OwnedReadHalf,
        pipeline: &Pipeline,
    ) -> std::io::Result<()> {
        let mut head = [0u8; RESPONSE_HEAD_SIZE];
        loop {
            read_half.read_exact(&mut head).await?;
            let ResponseHead { body_size, call_id } = ResponseHead::decode(&head);

            if body_size as usize > pipeline.max_body_size {
                warn!(
                    call_id,
                    body_size,
                    max_body_size = pipeline.max_body_size,
                    "response body exceeds configured maximum; discarding frame"
                );
                Self::discard_body(read_half, body_size as usize).await?;
                continue;
            }

            let mut body = vec![0u8; body_size as usize];
            read_half.read_exact(&mut body).await?;

            if let Err(e) = Decoder::decode(conn, call_id, body.into(), &pipeline.router) {
                warn!(call_id, error = %e, "protocol violation, discarding frame");
            }
        }
    }

    /// Reads and drops exactly `len` bytes, keeping the stream framed (the
    /// body was length-prefixed, so the next header still starts at the
    /// right offset) without allocating a buffer as large as the oversized
    /// length prefix claims.
    async fn discard_body(read_half: &mut OwnedReadHalf, mut len: usize) -> std::io::Result<()> {
        let mut sink = [0u8; 4096];
        while len > 0 {
            let n = len.min(sink.len());
            read_half.read_exact(&mut sink[..n]).await?;
            len -= n;
        }
        Ok(())
    }

    /// Owns `write_half` for the lifetime of one connection generation and
    /// drains `queue_rx` strictly in FIFO order, so no lock is needed to
    /// keep writes ordered — there is exactly one writer.
    async fn write_loop(
        conn: Arc<Connection>,
        mut write_half: OwnedWriteHalf,
        mut queue_rx: mpsc::UnboundedReceiver<u64>,
        pipeline: Pipeline,
        write_chunk_size: usize,
        close_tx: mpsc::UnboundedSender<ConnectionEvent>,
    ) {
        let cancel = conn.cancel.clone();
        let mut buf = BytesMut::with_capacity(write_chunk_size);

        loop {
            let call_id = tokio::select! {
                _ = cancel.cancelled() => break,
                item = queue_rx.recv() => match item {
                    Some(call_id) => call_id,
                    None => break,
                },
            };

            loop {
                let remaining = write_chunk_size.saturating_sub(buf.len());
                match Encoder::encode(&conn, call_id, &pipeline.router, &mut buf, remaining) {
                    EncodeOutcome::Written(_) => break,
                    EncodeOutcome::Retry => {
                        if let Err(e) = Self::flush(&mut write_half, &mut buf).await {
                            warn!(call_id, error = %e, "write failed while flushing for retry");
                            let _ = close_tx.send(ConnectionEvent::Close(conn));
                            return;
                        }
                    },
                }
            }

            // Flush once the queue is momentarily empty, so a lone call
            // isn't held hostage waiting for the chunk buffer to fill.
            if queue_rx.is_empty() {
                if let Err(e) = Self::flush(&mut write_half, &mut buf).await {
                    warn!(error = %e, "write failed");
                    let _ = close_tx.send(ConnectionEvent::Close(conn));
                    return;
                }
            }
        }
    }

    async fn flush(write_half: &mut OwnedWriteHalf, buf: &mut BytesMut) -> std::io::Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        write_half.write_all(buf).await?;
        buf.clear();
        Ok(())
    }
}

impl Reactor for TokioReactor {
    fn add_connection(&self, conn: Arc<Connection>, read_half: OwnedReadHalf, write_half: OwnedWriteHalf) {
        let pipeline = self.pipeline_factory.build_pipeline(&conn);
        let (queue_tx, queue_rx) = mpsc::unbounded_channel::<u64>();
        conn.install_write_queue(Some(queue_tx));

        let close_tx = self.close_tx.clone();
        tokio::spawn(Self::read_loop(conn.clone(), read_half, pipeline.clone(), close_tx.clone()));
        tokio::spawn(Self::write_loop(conn, write_half, queue_rx, pipeline, self.write_chunk_size, close_tx));
    }

    fn send(&self, conn: Arc<Connection>, call_id: u64) {
        match conn.write_queue() {
            Some(tx) => {
                if tx.send(call_id).is_err() {
                    warn!(call_id, "write queue closed; connection already tearing down");
                }
            },
            None => warn!(call_id, "send() called before a write queue was installed for this connection"),
        }
    }
}
