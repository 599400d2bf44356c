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

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr};
use std::os::fd::AsRawFd;

use mio::net::{TcpListener, TcpStream};

/// A connected, non-blocking client socket.
///
/// Reads and writes report `ErrorKind::WouldBlock` instead of waiting.
/// Dropping the value closes the socket.
pub trait Transport: Read + Write + AsRawFd {
    /// Half-close: shuts down the write direction only.
    fn shutdown_write(&self) -> io::Result<()>;
}

/// A non-blocking listening socket.
pub trait Acceptor: AsRawFd {
    type Stream: Transport;

    /// Accepts one pending connection, or fails with `ErrorKind::WouldBlock`
    /// when none is queued.
    fn accept(&self) -> io::Result<(Self::Stream, SocketAddr)>;
}

impl Transport for TcpStream {
    fn shutdown_write(&self) -> io::Result<()> {
        self.shutdown(Shutdown::Write)
    }
}

impl Acceptor for TcpListener {
    type Stream = TcpStream;

    fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self)
    }
}
