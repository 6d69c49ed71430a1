// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Frame layout. Every integer is big-endian, matching
//! `bytes::BufMut::put_u32`/`put_u64`'s default.

use bytes::{BufMut, BytesMut};

/// `body_size(u32) + service_id(u32) + method_index(u32) + call_id(u64)`.
pub const REQUEST_HEAD_SIZE: usize = 20;

/// `body_size(u32) + call_id(u64)`.
pub const RESPONSE_HEAD_SIZE: usize = 12;

/// A decoded response head, read off the wire before its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHead {
    pub body_size: u32,
    pub call_id: u64,
}

impl ResponseHead {
    pub fn decode(buf: &[u8; RESPONSE_HEAD_SIZE]) -> Self {
        let body_size = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let call_id = u64::from_be_bytes([
            buf[4], buf[5], buf[6], buf[7], buf[8], buf[9], buf[10], buf[11],
        ]);
        Self { body_size, call_id }
    }
}

/// A request head, written ahead of a serialized request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHead {
    pub body_size: u32,
    pub service_id: u32,
    pub method_index: u32,
    pub call_id: u64,
}

impl RequestHead {
    pub fn write_into(&self, buf: &mut BytesMut) {
        buf.put_u32(self.body_size);
        buf.put_u32(self.service_id);
        buf.put_u32(self.method_index);
        buf.put_u64(self.call_id);
    }
}
