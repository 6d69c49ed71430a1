// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Hands a resolved [`CallOutcome`] to the downstream resume queue. Routing
//! is deliberately split from resuming: the decoder (or the encoder, for a
//! fire-and-forget send) only ever decides *what* happened, and it is the
//! downstream task that performs the actual wakeup, so a slow or panicking
//! caller never blocks the socket's read or write path.

use tokio::sync::{mpsc, oneshot};

use crate::{call::CallOutcome, error::ClientError};

pub(crate) struct WakeItem {
    pub completion: oneshot::Sender<CallOutcome>,
    pub outcome: CallOutcome,
}

#[derive(Clone)]
pub struct Router {
    downstream: mpsc::UnboundedSender<WakeItem>,
}

impl Router {
    pub(crate) fn new(downstream: mpsc::UnboundedSender<WakeItem>) -> Self {
        Self { downstream }
    }

    pub(crate) fn route(
        &self,
        completion: oneshot::Sender<CallOutcome>,
        outcome: CallOutcome,
    ) -> Result<(), ClientError> {
        self.downstream
            .send(WakeItem { completion, outcome })
            .map_err(|_| ClientError::ShuttingDown)
    }
}
