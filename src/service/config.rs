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

extern crate config as _;

use std::path::Path;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::network::{BufferLimits, ReactorOptions};

use super::{AppError, AppResult};

pub static GLOBAL_CONFIG: OnceCell<ServerConfig> = OnceCell::new();
pub fn global_config() -> &'static ServerConfig {
    GLOBAL_CONFIG
        .get()
        .expect("global config is read before it was set up")
}

/// Environment variables with this prefix override file values,
/// e.g. `EVHTTPD__NETWORK__PORT=9000`.
const ENV_PREFIX: &str = "EVHTTPD";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    pub ip: String,
    pub port: u16,
    pub max_connection: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            ip: "0.0.0.0".to_string(),
            port: 8080,
            max_connection: 4096,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ReactorConfig {
    /// Capacity hint for the watcher, the number of events fetched per poll.
    pub poll_capacity: usize,
    /// Wait budget of one poll in milliseconds. `0` polls without blocking,
    /// a negative value blocks until something is ready.
    pub poll_timeout_ms: i64,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        ReactorConfig {
            poll_capacity: 4096,
            poll_timeout_ms: 100,
        }
    }
}

impl ReactorConfig {
    pub fn wait_budget(&self) -> Option<Duration> {
        u64::try_from(self.poll_timeout_ms)
            .ok()
            .map(Duration::from_millis)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BufferConfig {
    pub initial_capacity: usize,
    /// Hard ceiling for both the receive and the send buffer of a connection.
    pub max_package_size: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        BufferConfig {
            initial_capacity: 4 * 1024,
            max_package_size: 1024 * 1024,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub server_name: String,
    pub body: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            server_name: env!("CARGO_PKG_NAME").to_string(),
            body: "<html><body><h1>It works!</h1></body></html>\n".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    /// When set, logs are also written to an hourly rolling file in this directory.
    pub dir: Option<String>,
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            dir: None,
            file_prefix: "evhttpd.log".to_string(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub network: NetworkConfig,
    pub reactor: ReactorConfig,
    pub buffer: BufferConfig,
    pub http: HttpConfig,
    pub log: LogConfig,
}

impl ServerConfig {
    pub fn set_up_config<P: AsRef<Path>>(path: P) -> AppResult<ServerConfig> {
        let path_str = path
            .as_ref()
            .to_str()
            .ok_or(AppError::InvalidValue(format!(
                "config file path: {}",
                path.as_ref().to_string_lossy()
            )))?;
        let config = config::Config::builder()
            .add_source(config::File::with_name(path_str))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Rejects values the reactor cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        if self.buffer.max_package_size == 0 {
            return Err(AppError::InvalidValue(
                "buffer.max_package_size must be greater than 0".to_string(),
            ));
        }
        if self.buffer.initial_capacity > self.buffer.max_package_size {
            return Err(AppError::InvalidValue(format!(
                "buffer.initial_capacity {} exceeds buffer.max_package_size {}",
                self.buffer.initial_capacity, self.buffer.max_package_size
            )));
        }
        if self.reactor.poll_capacity == 0 {
            return Err(AppError::InvalidValue(
                "reactor.poll_capacity must be greater than 0".to_string(),
            ));
        }
        if self.network.max_connection == 0 {
            return Err(AppError::InvalidValue(
                "network.max_connection must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn reactor_options(&self) -> ReactorOptions {
        ReactorOptions {
            limits: BufferLimits {
                initial_capacity: self.buffer.initial_capacity,
                max_size: self.buffer.max_package_size,
            },
            max_connection: self.network.max_connection,
            poll_timeout: self.reactor.wait_budget(),
        }
    }
}
