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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::debug;

use super::AppResult;

/// Stop signal for the event loop.
///
/// Clones share one flag. The reactor checks it between poll turns, so a
/// trigger takes effect after at most one wait budget.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    notify: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Shutdown {
        Shutdown::default()
    }

    pub fn is_shutdown(&self) -> bool {
        self.notify.load(Ordering::Acquire)
    }

    pub fn trigger(&self) {
        self.notify.store(true, Ordering::Release);
    }

    /// Makes SIGINT and SIGTERM trigger this handle instead of killing the
    /// process. The reactor sees the flag once its current poll returns, which
    /// with a negative wait budget may take until the next readiness.
    pub fn register_signals(&self) -> AppResult<()> {
        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&self.notify))?;
            debug!(signal, "shutdown signal registered");
        }
        Ok(())
    }
}
