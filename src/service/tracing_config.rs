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

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use super::config::LogConfig;
use super::{AppError, AppResult};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Maps the `-v` count of the command line to a default filter directive.
fn default_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// `RUST_LOG` always wins when it is set.
fn env_filter(verbose: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(verbose)))
}

/// Console-only subscriber, used by tests and tools.
///
/// Installing twice is not an error, the first subscriber stays in place.
pub fn setup_local_tracing() -> AppResult<()> {
    let timer = ChronoLocal::new(TIME_FORMAT.to_string());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(timer)
        .with_target(true)
        .with_line_number(true)
        .with_test_writer();
    let _ = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(EnvFilter::from_default_env())
        .try_init();
    Ok(())
}

/// Subscriber for the server binary.
///
/// Logs go to stdout and, when `log.dir` is configured, to an hourly rolling
/// file as well. The returned guard flushes the file writer on drop and must
/// be kept alive for the lifetime of the process.
pub fn setup_tracing(verbose: u8, log: &LogConfig) -> AppResult<Option<WorkerGuard>> {
    let timer = ChronoLocal::new(TIME_FORMAT.to_string());
    let filter = env_filter(verbose);

    match &log.dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::hourly(dir, &log.file_prefix);
            let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
            // write to console and file at the same time
            let writer = non_blocking.and(std::io::stdout);
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_timer(timer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(writer);
            tracing_subscriber::registry()
                .with(fmt_layer)
                .with(filter)
                .try_init()
                .map_err(|err| AppError::IllegalStateError(err.to_string()))?;
            Ok(Some(worker_guard))
        }
        None => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_timer(timer)
                .with_target(true)
                .with_line_number(true)
                .with_ansi(true);
            tracing_subscriber::registry()
                .with(fmt_layer)
                .with(filter)
                .try_init()
                .map_err(|err| AppError::IllegalStateError(err.to_string()))?;
            Ok(None)
        }
    }
}
