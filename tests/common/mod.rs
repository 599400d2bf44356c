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

//! Scripted stand-ins for the OS: a watcher fed with readiness by the test,
//! sockets whose reads and writes are released one readiness at a time, and a
//! request handler that records what it was given. Every side effect lands in
//! one shared call log so tests can check ordering.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::{self, ErrorKind, Read, Write};
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, RawFd};
use std::rc::Rc;
use std::time::Duration;

use bytes::Bytes;
use evhttpd::network::{
    Acceptor, Interest, Readiness, RequestHandler, SessionId, Transport, Watcher,
};
use evhttpd::{AppError, AppResult};

pub const LISTENER_FD: RawFd = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Register(RawFd, Interest),
    Modify(RawFd, Interest),
    Unregister(RawFd),
    Acknowledge(RawFd, usize),
    ShutdownWrite(RawFd),
    Close(RawFd),
}

#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.borrow_mut().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.borrow().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.0.borrow().iter().filter(|c| *c == call).count()
    }

    pub fn position(&self, call: &Call) -> Option<usize> {
        self.0.borrow().iter().position(|c| c == call)
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

// ---------------------------------------------------------------------------
// sockets
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct StreamState {
    inbound: VecDeque<Vec<u8>>,
    readable: bool,
    eof: bool,
    write_budget: usize,
    pub written: Vec<u8>,
    read_error: Option<ErrorKind>,
    write_error: Option<ErrorKind>,
    shutdown_error: Option<ErrorKind>,
}

/// Test-side handle of a [`MockStream`].
#[derive(Debug, Clone)]
pub struct StreamHandle {
    pub fd: RawFd,
    state: Rc<RefCell<StreamState>>,
}

impl StreamHandle {
    /// Makes `bytes` readable; the next read returns exactly them.
    pub fn deliver(&self, bytes: &[u8]) {
        let mut state = self.state.borrow_mut();
        state.inbound.push_back(bytes.to_vec());
        state.readable = true;
    }

    /// The peer shuts down its write direction.
    pub fn close_by_peer(&self) {
        let mut state = self.state.borrow_mut();
        state.eof = true;
        state.readable = true;
    }

    /// Lets the socket accept up to `bytes` more bytes.
    pub fn allow_write(&self, bytes: usize) {
        self.state.borrow_mut().write_budget = bytes;
    }

    pub fn fail_reads(&self, kind: ErrorKind) {
        let mut state = self.state.borrow_mut();
        state.read_error = Some(kind);
        state.readable = true;
    }

    pub fn fail_writes(&self, kind: ErrorKind) {
        self.state.borrow_mut().write_error = Some(kind);
    }

    pub fn fail_shutdown(&self, kind: ErrorKind) {
        self.state.borrow_mut().shutdown_error = Some(kind);
    }

    pub fn written(&self) -> Vec<u8> {
        self.state.borrow().written.clone()
    }
}

#[derive(Debug)]
pub struct MockStream {
    fd: RawFd,
    state: Rc<RefCell<StreamState>>,
    log: CallLog,
}

impl MockStream {
    pub fn new(fd: RawFd, log: &CallLog) -> (MockStream, StreamHandle) {
        let state = Rc::new(RefCell::new(StreamState::default()));
        let handle = StreamHandle {
            fd,
            state: state.clone(),
        };
        let stream = MockStream {
            fd,
            state,
            log: log.clone(),
        };
        (stream, handle)
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        if let Some(kind) = state.read_error.take() {
            return Err(kind.into());
        }
        if let Some(mut chunk) = state.inbound.pop_front() {
            let count = chunk.len().min(buf.len());
            buf[..count].copy_from_slice(&chunk[..count]);
            if count < chunk.len() {
                state.inbound.push_front(chunk.split_off(count));
            }
            return Ok(count);
        }
        if state.eof {
            return Ok(0);
        }
        state.readable = false;
        Err(ErrorKind::WouldBlock.into())
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        if let Some(kind) = state.write_error.take() {
            return Err(kind.into());
        }
        if state.write_budget == 0 {
            return Err(ErrorKind::WouldBlock.into());
        }
        let count = buf.len().min(state.write_budget);
        state.write_budget -= count;
        state.written.extend_from_slice(&buf[..count]);
        Ok(count)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl AsRawFd for MockStream {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Transport for MockStream {
    fn shutdown_write(&self) -> io::Result<()> {
        self.log.push(Call::ShutdownWrite(self.fd));
        match self.state.borrow_mut().shutdown_error.take() {
            Some(kind) => Err(kind.into()),
            None => Ok(()),
        }
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.log.push(Call::Close(self.fd));
    }
}

/// Listener whose accept hands out queued connections, then would-block.
#[derive(Debug)]
pub struct MockAcceptor {
    pending: Rc<RefCell<VecDeque<io::Result<MockStream>>>>,
}

#[derive(Debug, Clone)]
pub struct AcceptorHandle {
    pending: Rc<RefCell<VecDeque<io::Result<MockStream>>>>,
    log: CallLog,
}

impl MockAcceptor {
    pub fn new(log: &CallLog) -> (MockAcceptor, AcceptorHandle) {
        let pending = Rc::new(RefCell::new(VecDeque::new()));
        (
            MockAcceptor {
                pending: pending.clone(),
            },
            AcceptorHandle {
                pending,
                log: log.clone(),
            },
        )
    }
}

impl AcceptorHandle {
    /// Queues a client connection on descriptor `fd`.
    pub fn connect(&self, fd: RawFd) -> StreamHandle {
        let (stream, handle) = MockStream::new(fd, &self.log);
        self.pending.borrow_mut().push_back(Ok(stream));
        handle
    }

    pub fn fail_next_accept(&self, kind: ErrorKind) {
        self.pending.borrow_mut().push_back(Err(kind.into()));
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl AsRawFd for MockAcceptor {
    fn as_raw_fd(&self) -> RawFd {
        LISTENER_FD
    }
}

impl Acceptor for MockAcceptor {
    type Stream = MockStream;

    fn accept(&self) -> io::Result<(MockStream, SocketAddr)> {
        match self.pending.borrow_mut().pop_front() {
            Some(Ok(stream)) => {
                let peer = SocketAddr::from(([127, 0, 0, 1], 40000 + stream.fd as u16));
                Ok((stream, peer))
            }
            Some(Err(err)) => Err(err),
            None => Err(ErrorKind::WouldBlock.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// watcher
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct WatcherState {
    entries: HashMap<RawFd, (Option<SessionId>, Interest)>,
    turns: VecDeque<Vec<(RawFd, Readiness)>>,
    ready: Vec<(Option<SessionId>, Readiness)>,
    fail_next_poll: bool,
    polls: usize,
}

/// Watcher whose poll results are scripted by the test.
///
/// Readiness scripted for a descriptor that is not registered is dropped at
/// poll time, the way an OS poller never reports removed entries.
#[derive(Debug, Clone)]
pub struct ScriptedWatcher {
    state: Rc<RefCell<WatcherState>>,
    log: CallLog,
}

impl ScriptedWatcher {
    pub fn new(log: &CallLog) -> ScriptedWatcher {
        ScriptedWatcher {
            state: Rc::new(RefCell::new(WatcherState::default())),
            log: log.clone(),
        }
    }

    /// Scripts the readiness reported by the next poll.
    pub fn push_turn(&self, ready: Vec<(RawFd, Readiness)>) {
        self.state.borrow_mut().turns.push_back(ready);
    }

    pub fn fail_next_poll(&self) {
        self.state.borrow_mut().fail_next_poll = true;
    }

    pub fn entry(&self, fd: RawFd) -> Option<(Option<SessionId>, Interest)> {
        self.state.borrow().entries.get(&fd).copied()
    }

    pub fn is_registered(&self, fd: RawFd) -> bool {
        self.state.borrow().entries.contains_key(&fd)
    }

    pub fn polls(&self) -> usize {
        self.state.borrow().polls
    }
}

impl Watcher for ScriptedWatcher {
    fn register(
        &mut self,
        fd: RawFd,
        session: Option<SessionId>,
        interest: Interest,
    ) -> AppResult<()> {
        self.log.push(Call::Register(fd, interest));
        self.state
            .borrow_mut()
            .entries
            .insert(fd, (session, interest));
        Ok(())
    }

    fn modify(
        &mut self,
        fd: RawFd,
        session: Option<SessionId>,
        interest: Interest,
    ) -> AppResult<()> {
        self.log.push(Call::Modify(fd, interest));
        let mut state = self.state.borrow_mut();
        match state.entries.get_mut(&fd) {
            Some(entry) => {
                *entry = (session, interest);
                Ok(())
            }
            None => Err(AppError::IllegalStateError(format!(
                "fd {fd} is not registered"
            ))),
        }
    }

    fn unregister(&mut self, fd: RawFd) {
        self.log.push(Call::Unregister(fd));
        self.state.borrow_mut().entries.remove(&fd);
    }

    fn acknowledge(&mut self, fd: RawFd, index: usize) {
        self.log.push(Call::Acknowledge(fd, index));
    }

    fn poll(&mut self, _timeout: Option<Duration>) -> AppResult<usize> {
        let mut state = self.state.borrow_mut();
        state.polls += 1;
        state.ready.clear();
        if state.fail_next_poll {
            state.fail_next_poll = false;
            return Err(io::Error::from(ErrorKind::Other).into());
        }
        let turn = state.turns.pop_front().unwrap_or_default();
        for (fd, readiness) in turn {
            if let Some((session, _)) = state.entries.get(&fd).copied() {
                state.ready.push((session, readiness));
            }
        }
        Ok(state.ready.len())
    }

    fn event_at(&self, index: usize) -> Readiness {
        self.state
            .borrow()
            .ready
            .get(index)
            .map_or(Readiness::Unrecognized, |(_, readiness)| *readiness)
    }

    fn data_at(&self, index: usize) -> Option<SessionId> {
        self.state
            .borrow()
            .ready
            .get(index)
            .and_then(|(session, _)| *session)
    }
}

// ---------------------------------------------------------------------------
// request handler
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct HandlerState {
    requests: Vec<Vec<u8>>,
    fail: bool,
}

/// Complete once the header terminator arrived; answers with a fixed body.
#[derive(Debug, Clone)]
pub struct RecordingHandler {
    response: Bytes,
    state: Rc<RefCell<HandlerState>>,
}

impl RecordingHandler {
    pub fn new(response: &'static [u8]) -> RecordingHandler {
        RecordingHandler {
            response: Bytes::from_static(response),
            state: Rc::new(RefCell::new(HandlerState::default())),
        }
    }

    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.state.borrow().requests.clone()
    }

    pub fn fail_requests(&self) {
        self.state.borrow_mut().fail = true;
    }
}

impl RequestHandler for RecordingHandler {
    fn is_complete(&self, received: &[u8]) -> bool {
        received.ends_with(b"\r\n\r\n")
    }

    fn handle(&mut self, request: &[u8]) -> AppResult<Bytes> {
        let mut state = self.state.borrow_mut();
        state.requests.push(request.to_vec());
        if state.fail {
            return Err(AppError::MalformedProtocol("rejected".to_string()));
        }
        Ok(self.response.clone())
    }
}
