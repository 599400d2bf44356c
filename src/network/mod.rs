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

//! Network Module Implementation
//!
//! The event-driven core of the server: a single-threaded reactor that
//! multiplexes one listening socket and many client sockets over a readiness
//! watcher, and drives each connection through non-blocking receive and send
//! state machines.
//!
//! # Components
//!
//! - `Watcher`: readiness registry trait, `MioWatcher` is the OS backend
//! - `Acceptor` / `Transport`: non-blocking listening and client sockets
//! - `Session`: per-connection socket and buffers
//! - `recv_all` / `send_all`: the transfer state machines
//! - `RequestHandler`: framing and request processing, supplied by the caller
//! - `Reactor`: the event loop, accept handling and teardown
//!
//! # Connection lifecycle
//!
//! accept -> read readiness until the handler's framing rule is satisfied ->
//! response queued, interest switched to write -> write readiness until the
//! response is flushed -> half-close -> teardown. Any error, overflow, peer
//! close or unexpected readiness goes straight to teardown.

pub use buffer::{BufferLimits, Overflow, RecvBuffer, SendBuffer};
pub use handler::RequestHandler;
pub use mio_watcher::MioWatcher;
pub use reactor::{Reactor, ReactorOptions};
pub use session::Session;
pub use transfer::{recv_all, send_all, RecvOutcome, SendOutcome};
pub use transport::{Acceptor, Transport};
pub use watcher::{Interest, Readiness, SessionId, Watcher};

mod buffer;
mod handler;
mod mio_watcher;
mod reactor;
mod session;
mod transfer;
mod transport;
mod watcher;
