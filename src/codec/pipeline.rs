// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Binds Encoder/Decoder/Router to a connection (§2 Pipeline factory, §6
//! "Pipeline factory contract").
//!
//! Encoder and Decoder are stateless (see their own modules), so a
//! `Pipeline` is really just the three wire-format constants a connection's
//! read/write loops are configured with, plus the shared [`Router`] they
//! route resolved outcomes through. Building one is cheap and side-effect
//! free; [`PipelineFactory`] is the "lazy factory" the spec describes,
//! shared as one stateless instance per [`crate::client::client::Client`].

use crate::{codec::{router::Router, wire::RESPONSE_HEAD_SIZE}, connection::Connection};

/// Per-connection pipeline configuration handed to a [`crate::reactor::Reactor`]
/// implementation when it attaches read/write loops to a connection.
#[derive(Clone)]
pub struct Pipeline {
    /// Bytes of response head to read before a response body (§4.1): 12.
    pub response_head_size: usize,
    /// Width in bytes of the body-size length-prefix field in both the
    /// request and response heads (§4.1): 4.
    pub body_size_field_width: usize,
    /// Upper bound on an accepted response body (`RuntimeConfig::max_response_body`).
    pub max_body_size: usize,
    /// Where resolved call outcomes (response, fire-and-forget ack, failure)
    /// are routed for the downstream-resume task to pick up.
    pub router: Router,
}

/// Builds [`Pipeline`] values for connections. Stateless: every connection a
/// given `Client` owns gets parameters from the same `Config`, so this
/// holds exactly the two knobs that differ from the wire-format constants.
#[derive(Clone)]
pub struct PipelineFactory {
    max_response_body: usize,
    router: Router,
}

impl PipelineFactory {
    pub fn new(max_response_body: usize, router: Router) -> Self {
        Self { max_response_body, router }
    }

    /// `conn` is accepted (rather than this being a free function) so a
    /// `Reactor` that wants per-connection pipeline variation has the seam
    /// to do so; this implementation's parameters don't vary by connection.
    pub fn build_pipeline(&self, _conn: &Connection) -> Pipeline {
        Pipeline {
            response_head_size: RESPONSE_HEAD_SIZE,
            body_size_field_width: 4,
            max_body_size: self.max_response_body,
            router: self.router.clone(),
        }
    }
}
