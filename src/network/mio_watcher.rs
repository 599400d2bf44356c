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

use std::io::ErrorKind;
use std::os::fd::RawFd;
use std::time::Duration;

use mio::event::Event;
use mio::unix::SourceFd;
use mio::{Events, Poll, Token};
use tracing::{debug, trace};

use crate::AppResult;

use super::watcher::{Interest, Readiness, SessionId, Watcher};

/// Token of the listening socket. Session ids start at 1.
const LISTENER: Token = Token(0);

/// [`Watcher`] backed by `mio` (epoll on Linux, kqueue on the BSDs).
///
/// mio is edge-triggered, so callers are expected to drain a descriptor until
/// it reports would-block; the reactor's accept, receive and send handling
/// all do.
#[derive(Debug)]
pub struct MioWatcher {
    poll: Poll,
    events: Events,
    ready: Vec<(Token, Readiness)>,
}

impl MioWatcher {
    /// Creates the OS poller. `capacity` bounds the events returned by one poll.
    pub fn new(capacity: usize) -> AppResult<MioWatcher> {
        Ok(MioWatcher {
            poll: Poll::new()?,
            events: Events::with_capacity(capacity),
            ready: Vec::with_capacity(capacity),
        })
    }
}

fn token_of(session: Option<SessionId>) -> Token {
    session.map_or(LISTENER, |id| Token(id.as_usize()))
}

fn mio_interest(interest: Interest) -> mio::Interest {
    match interest {
        Interest::Read => mio::Interest::READABLE,
        Interest::Write => mio::Interest::WRITABLE,
    }
}

// readable wins over the closed flags so that data sent right before a FIN
// is still read; the recv path then sees the orderly shutdown itself
fn classify(event: &Event) -> Readiness {
    readiness_of(
        event.is_readable(),
        event.is_writable(),
        event.is_read_closed() || event.is_write_closed() || event.is_error(),
    )
}

fn readiness_of(readable: bool, writable: bool, closed: bool) -> Readiness {
    if readable {
        Readiness::Read
    } else if writable {
        Readiness::Write
    } else if closed {
        Readiness::Eof
    } else {
        Readiness::Unrecognized
    }
}

impl Watcher for MioWatcher {
    fn register(
        &mut self,
        fd: RawFd,
        session: Option<SessionId>,
        interest: Interest,
    ) -> AppResult<()> {
        self.poll
            .registry()
            .register(&mut SourceFd(&fd), token_of(session), mio_interest(interest))?;
        Ok(())
    }

    fn modify(
        &mut self,
        fd: RawFd,
        session: Option<SessionId>,
        interest: Interest,
    ) -> AppResult<()> {
        self.poll
            .registry()
            .reregister(&mut SourceFd(&fd), token_of(session), mio_interest(interest))?;
        Ok(())
    }

    fn unregister(&mut self, fd: RawFd) {
        if let Err(err) = self.poll.registry().deregister(&mut SourceFd(&fd)) {
            debug!(fd, cause = %err, "deregister failed");
        }
    }

    fn acknowledge(&mut self, fd: RawFd, index: usize) {
        // edge-triggered: the kernel holds no level for this entry, the next
        // notification only comes with a new edge
        trace!(fd, index, "readiness acknowledged");
    }

    fn poll(&mut self, timeout: Option<Duration>) -> AppResult<usize> {
        self.ready.clear();
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            // a signal cut the wait short, nothing is ready
            Err(err) if err.kind() == ErrorKind::Interrupted => return Ok(0),
            Err(err) => return Err(err.into()),
        }
        self.ready.extend(
            self.events
                .iter()
                .map(|event| (event.token(), classify(event))),
        );
        Ok(self.ready.len())
    }

    fn event_at(&self, index: usize) -> Readiness {
        self.ready
            .get(index)
            .map_or(Readiness::Unrecognized, |(_, readiness)| *readiness)
    }

    fn data_at(&self, index: usize) -> Option<SessionId> {
        self.ready
            .get(index)
            .and_then(|(token, _)| (*token != LISTENER).then(|| SessionId::new(token.0)))
    }
}
