// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! `RpcMessage` is the one seam where an actual serialization library would
//! plug in (protobuf, bincode, or a hand-rolled format). The engine itself
//! never requires it: it moves `Bytes` bodies around and only the
//! convenience wrapper `Client::call_typed` reaches for this trait.

use bytes::{Bytes, BytesMut};

use crate::error::ClientError;

/// An opaque, codec-agnostic request or response payload.
pub trait RpcMessage: Sized {
    /// Size of the encoded form, computed once and trusted by the caller
    /// when sizing the output buffer.
    fn encoded_len(&self) -> usize;

    /// Append the encoded form to `buf`. Implementations must write exactly
    /// `encoded_len()` bytes.
    fn encode_into(&self, buf: &mut BytesMut) -> Result<(), ClientError>;

    /// Parse a full response body.
    fn decode(buf: &[u8]) -> Result<Self, ClientError>;
}

impl RpcMessage for Bytes {
    fn encoded_len(&self) -> usize {
        self.len()
    }

    fn encode_into(&self, buf: &mut BytesMut) -> Result<(), ClientError> {
        buf.extend_from_slice(self);
        Ok(())
    }

    fn decode(buf: &[u8]) -> Result<Self, ClientError> {
        Ok(Bytes::copy_from_slice(buf))
    }
}

impl RpcMessage for Vec<u8> {
    fn encoded_len(&self) -> usize {
        self.len()
    }

    fn encode_into(&self, buf: &mut BytesMut) -> Result<(), ClientError> {
        buf.extend_from_slice(self);
        Ok(())
    }

    fn decode(buf: &[u8]) -> Result<Self, ClientError> {
        Ok(buf.to_vec())
    }
}
