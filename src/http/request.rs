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

use crate::AppError::{Incomplete, MalformedProtocol};
use crate::AppResult;

const HEADER_END: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub version: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

/// Length of the header block including the blank line, if it is complete.
fn header_len(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(HEADER_END.len())
        .position(|window| window == HEADER_END)
        .map(|position| position + HEADER_END.len())
}

fn header_lines(head: &[u8]) -> AppResult<std::str::Lines<'_>> {
    let head = std::str::from_utf8(head)
        .map_err(|_| MalformedProtocol("request head is not valid utf-8".to_string()))?;
    Ok(head.lines())
}

fn content_length(head: &[u8]) -> AppResult<usize> {
    for line in header_lines(head)?.skip(1) {
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                return value.trim().parse::<usize>().map_err(|_| {
                    MalformedProtocol(format!("invalid content-length {}", value.trim()))
                });
            }
        }
    }
    Ok(0)
}

impl HttpRequest {
    /// Checks whether `buffer` holds a whole request: the header block and,
    /// when `Content-Length` is present, that many body bytes.
    ///
    /// Returns `Err(Incomplete)` while more bytes are needed.
    pub fn check(buffer: &[u8]) -> AppResult<()> {
        let Some(head_len) = header_len(buffer) else {
            return Err(Incomplete);
        };
        let body_len = content_length(&buffer[..head_len])?;
        if buffer.len() < head_len.saturating_add(body_len) {
            return Err(Incomplete);
        }
        Ok(())
    }

    pub fn parse(buffer: &[u8]) -> AppResult<HttpRequest> {
        HttpRequest::check(buffer)?;
        let head_len = header_len(buffer).ok_or(Incomplete)?;
        let body_len = content_length(&buffer[..head_len])?;

        let mut lines = header_lines(&buffer[..head_len])?;
        let request_line = lines
            .next()
            .ok_or_else(|| MalformedProtocol("missing request line".to_string()))?;
        let mut parts = request_line.split_whitespace();
        let (Some(method), Some(path), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(MalformedProtocol(format!(
                "invalid request line {request_line:?}"
            )));
        };
        if !version.starts_with("HTTP/") {
            return Err(MalformedProtocol(format!("invalid version {version:?}")));
        }

        let mut headers = Vec::new();
        for line in lines.filter(|line| !line.is_empty()) {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| MalformedProtocol(format!("invalid header {line:?}")))?;
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        Ok(HttpRequest {
            method: method.to_string(),
            path: path.to_string(),
            version: version.to_string(),
            headers,
            body: Bytes::copy_from_slice(&buffer[head_len..head_len + body_len]),
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
