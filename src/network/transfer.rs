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

//! Non-blocking receive and send state machines.
//!
//! Each call moves a transfer forward as far as the socket allows and stops at
//! the first would-block. Progress lives in the buffers, so the next readiness
//! notification resumes exactly where this one stopped.

use std::io::{self, ErrorKind, Read, Write};

use super::buffer::{Overflow, RecvBuffer, SendBuffer};

const READ_CHUNK_SIZE: usize = 4 * 1024;

#[derive(Debug)]
pub enum RecvOutcome {
    /// The request would not fit under the buffer ceiling.
    Overflow(Overflow),
    Error(io::Error),
    /// The peer shut down its write direction.
    Closed,
    /// The framing rule wants more bytes, wait for the next read readiness.
    Incomplete,
    /// The framing rule is satisfied.
    Complete,
}

#[derive(Debug)]
pub enum SendOutcome {
    /// The queued response is larger than the buffer ceiling.
    Overflow(Overflow),
    Error(io::Error),
    /// Some bytes remain, wait for the next write readiness.
    Incomplete,
    Complete,
}

/// Reads everything the socket has into `buffer`.
///
/// `is_complete` is the framing rule; it sees the whole buffer after every
/// successful read and reading stops as soon as it returns true.
pub fn recv_all<R, F>(reader: &mut R, buffer: &mut RecvBuffer, is_complete: F) -> RecvOutcome
where
    R: Read,
    F: Fn(&[u8]) -> bool,
{
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => return RecvOutcome::Closed,
            Ok(read) => {
                if let Err(overflow) = buffer.append(&chunk[..read]) {
                    return RecvOutcome::Overflow(overflow);
                }
                if is_complete(buffer.as_bytes()) {
                    return RecvOutcome::Complete;
                }
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => return RecvOutcome::Incomplete,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return RecvOutcome::Error(err),
        }
    }
}

/// Writes the unsent part of `buffer` until it is drained or the socket
/// would block.
pub fn send_all<W: Write>(writer: &mut W, buffer: &mut SendBuffer, ceiling: usize) -> SendOutcome {
    if buffer.total() > ceiling {
        return SendOutcome::Overflow(Overflow {
            required: buffer.total(),
            ceiling,
        });
    }
    while !buffer.is_complete() {
        match writer.write(buffer.remaining()) {
            Ok(0) => {
                return SendOutcome::Error(io::Error::new(
                    ErrorKind::WriteZero,
                    "socket accepted no bytes",
                ))
            }
            Ok(written) => buffer.advance(written),
            Err(err) if err.kind() == ErrorKind::WouldBlock => return SendOutcome::Incomplete,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return SendOutcome::Error(err),
        }
    }
    SendOutcome::Complete
}
