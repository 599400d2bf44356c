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

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::os::fd::RawFd;
use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use crate::{AppResult, Shutdown};

use super::buffer::BufferLimits;
use super::handler::RequestHandler;
use super::session::Session;
use super::transfer::{RecvOutcome, SendOutcome};
use super::transport::Acceptor;
use super::watcher::{Interest, Readiness, SessionId, Watcher};

#[derive(Debug, Clone, Copy)]
pub struct ReactorOptions {
    pub limits: BufferLimits,
    /// Open sessions beyond this count are refused right after accept.
    pub max_connection: usize,
    /// Wait budget of a single poll, `None` blocks until something is ready.
    pub poll_timeout: Option<Duration>,
}

impl Default for ReactorOptions {
    fn default() -> Self {
        ReactorOptions {
            limits: BufferLimits::default(),
            max_connection: 4096,
            poll_timeout: Some(Duration::from_millis(100)),
        }
    }
}

/// Single-threaded event loop over one listening socket and its sessions.
///
/// The reactor owns the listener, the watcher, the request handler and every
/// open [`Session`]. Each turn polls the watcher once and dispatches the ready
/// entries in the order the watcher reports them:
///
/// - an entry without a session is the listener, read readiness accepts;
/// - read readiness on a session advances its receive state machine;
/// - write readiness advances its send state machine;
/// - anything else closes the session.
///
/// Sessions are only ever released through [`Reactor::close_session`], which
/// unregisters the descriptor before the session (and with it the socket) is
/// dropped, so a closed descriptor can not be dispatched again.
pub struct Reactor<A, W, H>
where
    A: Acceptor,
{
    listener: A,
    listener_fd: RawFd,
    watcher: W,
    handler: H,
    sessions: HashMap<SessionId, Session<A::Stream>>,
    next_session_id: usize,
    options: ReactorOptions,
    shutdown: Shutdown,
}

impl<A, W, H> Reactor<A, W, H>
where
    A: Acceptor,
    W: Watcher,
    H: RequestHandler,
{
    /// Registers `listener` for read readiness and builds the reactor around it.
    pub fn new(
        listener: A,
        mut watcher: W,
        handler: H,
        options: ReactorOptions,
        shutdown: Shutdown,
    ) -> AppResult<Self> {
        let listener_fd = listener.as_raw_fd();
        watcher.register(listener_fd, None, Interest::Read)?;
        Ok(Reactor {
            listener,
            listener_fd,
            watcher,
            handler,
            sessions: HashMap::new(),
            next_session_id: 1,
            options,
            shutdown,
        })
    }

    /// Runs turns until shutdown is requested or polling fails.
    ///
    /// Every session still open when the loop ends is closed, and the listener
    /// is unregistered. A poll failure is returned to the caller.
    pub fn run(&mut self) -> AppResult<()> {
        let result = loop {
            if self.shutdown.is_shutdown() {
                info!("reactor received shutdown signal");
                break Ok(());
            }
            if let Err(err) = self.turn() {
                error!(cause = %err, os_error = ?err.raw_os_error(), "poll failed, leaving event loop");
                break Err(err);
            }
        };
        self.close_all();
        result
    }

    /// Polls once and dispatches every ready entry. Returns the number of
    /// ready entries.
    pub fn turn(&mut self) -> AppResult<usize> {
        let ready = self.watcher.poll(self.options.poll_timeout)?;
        for index in 0..ready {
            self.dispatch(index);
        }
        Ok(ready)
    }

    fn dispatch(&mut self, index: usize) {
        let readiness = self.watcher.event_at(index);
        let Some(id) = self.watcher.data_at(index) else {
            // only the listener is registered without a session
            if readiness == Readiness::Read {
                self.process_new_connection(index);
            }
            return;
        };
        let Some(fd) = self.sessions.get(&id).map(Session::descriptor) else {
            warn!(session = %id, ?readiness, "readiness reported for unknown session");
            return;
        };

        match readiness {
            Readiness::Read => {
                trace!(session = %id, "trying to recv data");
                self.process_client_read(id);
            }
            Readiness::Write => {
                trace!(session = %id, "trying to send data");
                self.process_client_write(id);
            }
            Readiness::Eof | Readiness::Unrecognized => {
                warn!(session = %id, fd, ?readiness, "unexpected readiness, closing session");
                let session = self.sessions.remove(&id);
                self.close_session(fd, session);
            }
        }
    }

    /// Accepts until the listener would block.
    ///
    /// Each accepted connection acknowledges the listener's readiness and
    /// becomes a session registered for read readiness. A would-block leaves
    /// everything as it is; any other failure is logged and the listener
    /// stays registered.
    fn process_new_connection(&mut self, index: usize) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    self.watcher.acknowledge(self.listener_fd, index);
                    self.open_session(stream, peer);
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => return,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    error!(cause = %err, os_error = ?err.raw_os_error(), "failed to accept socket");
                    return;
                }
            }
        }
    }

    fn open_session(&mut self, stream: A::Stream, peer: SocketAddr) {
        if self.sessions.len() >= self.options.max_connection {
            warn!(
                %peer,
                max_connection = self.options.max_connection,
                "connection limit reached, closing new connection"
            );
            return;
        }

        let id = SessionId::new(self.next_session_id);
        self.next_session_id += 1;
        let session = Session::new(id, stream, peer, self.options.limits);
        let fd = session.descriptor();

        if let Err(err) = self.watcher.register(fd, Some(id), Interest::Read) {
            error!(session = %id, fd, cause = %err, "failed to register session");
            self.close_session(fd, Some(session));
            return;
        }
        info!(session = %id, fd, %peer, "accepted connection");
        self.sessions.insert(id, session);
    }

    fn process_client_read(&mut self, id: SessionId) {
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };
        let handler = &self.handler;
        let outcome = session.receive(|received| handler.is_complete(received));

        match outcome {
            RecvOutcome::Overflow(overflow) => {
                warn!(session = %id, %overflow, "max request size reached");
                self.teardown(id);
            }
            RecvOutcome::Error(err) => {
                error!(session = %id, cause = %err, os_error = ?err.raw_os_error(), "failed to recv data");
                self.teardown(id);
            }
            RecvOutcome::Closed => {
                info!(session = %id, "client closed connection");
                self.teardown(id);
            }
            RecvOutcome::Incomplete => {
                trace!(session = %id, "request incomplete, waiting for more data");
            }
            RecvOutcome::Complete => self.handle_request(id),
        }
    }

    /// Hands a complete request to the handler, queues its response and
    /// switches the session to write readiness.
    fn handle_request(&mut self, id: SessionId) {
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };
        let request = session.take_request();
        debug!(
            session = %id,
            len = request.len(),
            "data received:\n{}",
            String::from_utf8_lossy(&request)
        );

        match self.handler.handle(&request) {
            Ok(response) => {
                session.queue_response(response);
                let fd = session.descriptor();
                if let Err(err) = self.watcher.modify(fd, Some(id), Interest::Write) {
                    error!(session = %id, fd, cause = %err, "failed to switch session to write");
                    self.teardown(id);
                }
            }
            Err(err) => {
                error!(session = %id, cause = %err, "request handler failed");
                self.teardown(id);
            }
        }
    }

    fn process_client_write(&mut self, id: SessionId) {
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };

        match session.send() {
            SendOutcome::Overflow(overflow) => {
                warn!(session = %id, %overflow, "max response size reached");
                self.teardown(id);
            }
            SendOutcome::Error(err) => {
                error!(session = %id, cause = %err, os_error = ?err.raw_os_error(), "failed to send data");
                self.teardown(id);
            }
            SendOutcome::Incomplete => {
                trace!(
                    session = %id,
                    sent = session.send_buffer().sent(),
                    total = session.send_buffer().total(),
                    "response partially sent"
                );
            }
            SendOutcome::Complete => {
                info!(session = %id, "sending data completed");
                if let Err(err) = session.shutdown_write() {
                    error!(session = %id, cause = %err, os_error = ?err.raw_os_error(), "shutdown error");
                }
                self.teardown(id);
            }
        }
    }

    fn teardown(&mut self, id: SessionId) {
        if let Some(session) = self.sessions.remove(&id) {
            let fd = session.descriptor();
            self.close_session(fd, Some(session));
        }
    }

    /// Releases a connection: removes `fd` from the watcher, then drops the
    /// session, which closes its socket and frees its buffers.
    ///
    /// Without a session there is no owned socket left, only the watcher
    /// entry is removed.
    pub fn close_session(&mut self, fd: RawFd, session: Option<Session<A::Stream>>) {
        self.watcher.unregister(fd);
        if let Some(session) = session {
            debug!(session = %session.id(), fd, peer = %session.peer(), "closing session");
            drop(session);
        }
    }

    fn close_all(&mut self) {
        let ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        for id in ids {
            self.teardown(id);
        }
        self.watcher.unregister(self.listener_fd);
        info!("all sessions closed");
    }

    pub fn session(&self, id: SessionId) -> Option<&Session<A::Stream>> {
        self.sessions.get(&id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
