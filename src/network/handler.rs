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

use bytes::Bytes;

use crate::AppResult;

/// Application side of a connection: framing plus request processing.
pub trait RequestHandler {
    /// Framing rule. Called with everything received so far on a connection;
    /// returns true once a whole request is there.
    fn is_complete(&self, received: &[u8]) -> bool;

    /// Turns a complete request into the response to send back.
    ///
    /// An error closes the connection without a response.
    fn handle(&mut self, request: &[u8]) -> AppResult<Bytes>;
}
