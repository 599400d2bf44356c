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

use std::io;
use std::net::SocketAddr;
use std::os::fd::RawFd;

use bytes::Bytes;
use tracing::trace;

use super::buffer::{BufferLimits, RecvBuffer, SendBuffer};
use super::transfer::{recv_all, send_all, RecvOutcome, SendOutcome};
use super::transport::Transport;
use super::watcher::SessionId;

/// State of one accepted client connection.
///
/// The session owns the socket; dropping the session closes it and frees both
/// buffers, which makes removal from the reactor's session store the single
/// release point of a connection.
#[derive(Debug)]
pub struct Session<S: Transport> {
    id: SessionId,
    stream: S,
    peer: SocketAddr,
    recv_buffer: RecvBuffer,
    send_buffer: SendBuffer,
    ceiling: usize,
}

impl<S: Transport> Session<S> {
    pub fn new(id: SessionId, stream: S, peer: SocketAddr, limits: BufferLimits) -> Session<S> {
        Session {
            id,
            stream,
            peer,
            recv_buffer: RecvBuffer::new(limits),
            send_buffer: SendBuffer::new(),
            ceiling: limits.max_size,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn descriptor(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn recv_buffer(&self) -> &RecvBuffer {
        &self.recv_buffer
    }

    pub fn send_buffer(&self) -> &SendBuffer {
        &self.send_buffer
    }

    /// Advances the receive state machine, see [`recv_all`].
    pub fn receive<F>(&mut self, is_complete: F) -> RecvOutcome
    where
        F: Fn(&[u8]) -> bool,
    {
        recv_all(&mut self.stream, &mut self.recv_buffer, is_complete)
    }

    /// Advances the send state machine, see [`send_all`].
    pub fn send(&mut self) -> SendOutcome {
        send_all(&mut self.stream, &mut self.send_buffer, self.ceiling)
    }

    /// Takes the received request out of the receive buffer.
    pub fn take_request(&mut self) -> Bytes {
        self.recv_buffer.take()
    }

    pub fn queue_response(&mut self, response: Bytes) {
        self.send_buffer.queue(response);
    }

    pub fn shutdown_write(&self) -> io::Result<()> {
        self.stream.shutdown_write()
    }
}

impl<S: Transport> Drop for Session<S> {
    fn drop(&mut self) {
        trace!(session = %self.id, peer = %self.peer, "session dropped");
    }
}
