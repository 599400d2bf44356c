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

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use mio::net::TcpListener;
use tracing::{error, info};

use crate::http::HttpHandler;
use crate::network::{MioWatcher, Reactor};
use crate::AppError::{IllegalStateError, InvalidValue};
use crate::AppResult;

use super::config::ServerConfig;
use super::Shutdown;

/// Resolves the configured listen host, which may be an IP literal or a
/// host name.
pub fn resolve_address(host: &str, port: u16) -> AppResult<SocketAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    (host, port)
        .to_socket_addrs()
        .map_err(|err| InvalidValue(format!("failed to resolve host {host}: {err}")))?
        .next()
        .ok_or_else(|| InvalidValue(format!("host {host} resolved to no address")))
}

/// Process-level wrapper around the reactor: binds the listener, creates the
/// watcher and runs the event loop until shutdown or a fatal poll error.
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    shutdown: Shutdown,
}

impl Server {
    pub fn new(config: &ServerConfig) -> Self {
        Server {
            config: config.clone(),
            shutdown: Shutdown::new(),
        }
    }

    /// Handle that stops [`Server::serve`] from another thread.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Binds a non-blocking listener on the configured address.
    pub fn bind(&self) -> AppResult<TcpListener> {
        let network_conf = &self.config.network;
        let listen_address = resolve_address(&network_conf.ip, network_conf.port)?;
        TcpListener::bind(listen_address).map_err(|err| {
            let error_msg = format!(
                "Failed to bind server to address: {} - Error: {}",
                listen_address, err
            );
            error!("{}", error_msg);
            IllegalStateError(error_msg)
        })
    }

    pub fn run(&self) -> AppResult<()> {
        let listener = self.bind()?;
        self.serve(listener)
    }

    /// Runs the event loop on an already bound listener.
    pub fn serve(&self, listener: TcpListener) -> AppResult<()> {
        let local_addr = listener.local_addr()?;
        info!("waiting connections on {}", local_addr);

        let watcher = MioWatcher::new(self.config.reactor.poll_capacity).map_err(|err| {
            error!(cause = %err, "failed to create watcher");
            err
        })?;
        let handler = HttpHandler::new(&self.config.http);
        let mut reactor = Reactor::new(
            listener,
            watcher,
            handler,
            self.config.reactor_options(),
            self.shutdown.clone(),
        )?;

        let result = reactor.run();

        info!("cleanup resources");
        // closes the listener and the OS poller
        drop(reactor);
        info!("finished");
        result
    }
}
