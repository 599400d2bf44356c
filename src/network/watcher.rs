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

use std::fmt;
use std::os::fd::RawFd;
use std::time::Duration;

use crate::AppResult;

/// Key of a session in the reactor's session store.
///
/// This is the only per-descriptor data a watcher keeps. The listening
/// socket is registered without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(usize);

impl SessionId {
    pub const fn new(raw: usize) -> SessionId {
        SessionId(raw)
    }

    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Readiness condition a descriptor is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Read,
    Write,
}

/// What a watcher reports for one ready entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Read,
    Write,
    Eof,
    Unrecognized,
}

/// Readiness-notification registry.
///
/// A watcher maps descriptors to an interest and an optional [`SessionId`],
/// and reports which entries became ready. Backends are interchangeable; the
/// reactor only talks to this trait.
///
/// Results of [`Watcher::poll`] stay addressable by index until the next poll.
pub trait Watcher {
    /// Adds an entry for `fd`.
    fn register(&mut self, fd: RawFd, session: Option<SessionId>, interest: Interest)
        -> AppResult<()>;

    /// Replaces the interest of an existing entry.
    fn modify(&mut self, fd: RawFd, session: Option<SessionId>, interest: Interest)
        -> AppResult<()>;

    /// Removes the entry for `fd`. Failures are logged, never reported, since
    /// teardown has to go on regardless.
    fn unregister(&mut self, fd: RawFd);

    /// Marks the readiness reported at `index` as handled without removing
    /// the entry.
    fn acknowledge(&mut self, fd: RawFd, index: usize);

    /// Waits at most `timeout` (forever when `None`) and returns the number of
    /// ready entries. An error is fatal for the event loop.
    fn poll(&mut self, timeout: Option<Duration>) -> AppResult<usize>;

    /// The readiness reported at `index`.
    fn event_at(&self, index: usize) -> Readiness;

    /// The session registered for the entry at `index`, `None` for the
    /// listening socket.
    fn data_at(&self, index: usize) -> Option<SessionId>;
}
