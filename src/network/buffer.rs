// Copyright 2025 jonefeewang@gmail.com
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-connection byte buffers.
//!
//! Both buffers are bounded by the same ceiling. The receive side enforces it
//! on every append, the send side when a transfer starts.

use bytes::{Bytes, BytesMut};

/// Sizing of the buffers owned by one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLimits {
    pub initial_capacity: usize,
    pub max_size: usize,
}

impl Default for BufferLimits {
    fn default() -> Self {
        BufferLimits {
            initial_capacity: 4 * 1024,
            max_size: 1024 * 1024,
        }
    }
}

/// A buffer would have to hold more than its ceiling allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{required} bytes required, ceiling is {ceiling}")]
pub struct Overflow {
    pub required: usize,
    pub ceiling: usize,
}

/// Growable receive buffer with a hard ceiling.
#[derive(Debug)]
pub struct RecvBuffer {
    buffer: BytesMut,
    ceiling: usize,
}

impl RecvBuffer {
    pub fn new(limits: BufferLimits) -> RecvBuffer {
        RecvBuffer {
            buffer: BytesMut::with_capacity(limits.initial_capacity.min(limits.max_size)),
            ceiling: limits.max_size,
        }
    }

    /// Appends `data`, growing the buffer when needed.
    ///
    /// Fails without touching the buffer when the result would exceed the
    /// ceiling.
    pub fn append(&mut self, data: &[u8]) -> Result<(), Overflow> {
        let required = self.buffer.len().saturating_add(data.len());
        if required > self.ceiling {
            return Err(Overflow {
                required,
                ceiling: self.ceiling,
            });
        }
        if required > self.buffer.capacity() {
            // double, but never plan for more than the ceiling
            let target = required
                .max(self.buffer.capacity().saturating_mul(2))
                .min(self.ceiling);
            self.buffer.reserve(target - self.buffer.len());
        }
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Hands out everything received so far and leaves the buffer empty.
    pub fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }
}

/// Bytes queued for transmission and how many of them went out already.
#[derive(Debug, Default)]
pub struct SendBuffer {
    buffer: Bytes,
    sent: usize,
}

impl SendBuffer {
    pub fn new() -> SendBuffer {
        SendBuffer::default()
    }

    /// Replaces the queued bytes and resets the offset.
    pub fn queue(&mut self, data: Bytes) {
        self.buffer = data;
        self.sent = 0;
    }

    /// The bytes not yet written.
    pub fn remaining(&self) -> &[u8] {
        &self.buffer[self.sent..]
    }

    pub fn advance(&mut self, count: usize) {
        self.sent = self.sent.saturating_add(count).min(self.buffer.len());
    }

    pub fn sent(&self) -> usize {
        self.sent
    }

    pub fn total(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_complete(&self) -> bool {
        self.sent == self.buffer.len()
    }
}
