// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Wire framing and the pipeline stages that sit on either side of a raw
//! socket: [`encoder`] turns a queued [`crate::call::CallTask`] into bytes,
//! [`decoder`] turns bytes back into a call id and a body, [`router`] hands
//! a resolved outcome to the downstream resume queue, and [`pipeline`] binds
//! the three to a connection.

pub mod decoder;
pub mod encoder;
pub mod message;
pub mod pipeline;
pub mod router;
pub mod wire;

pub use decoder::Decoder;
pub use encoder::{EncodeOutcome, Encoder};
pub use message::RpcMessage;
pub use pipeline::{Pipeline, PipelineFactory};
pub use router::Router;
