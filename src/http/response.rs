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

use bytes::{BufMut, Bytes, BytesMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    BadRequest,
    MethodNotAllowed,
}

impl StatusCode {
    pub fn as_u16(self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::MethodNotAllowed => 405,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
        }
    }
}

/// An HTTP/1.0 response. Connections are never reused, so every response
/// announces `Connection: close`.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Bytes,
    omit_body: bool,
}

impl HttpResponse {
    pub fn new(status: StatusCode) -> Self {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
            omit_body: false,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    /// Keeps `Content-Length` of the body but leaves the body out, for `HEAD`.
    pub fn without_body(mut self) -> Self {
        self.omit_body = true;
        self
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::with_capacity(128 + self.body.len());
        buffer.put_slice(
            format!(
                "HTTP/1.0 {} {}\r\n",
                self.status.as_u16(),
                self.status.reason()
            )
            .as_bytes(),
        );
        for (name, value) in &self.headers {
            buffer.put_slice(format!("{name}: {value}\r\n").as_bytes());
        }
        buffer.put_slice(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());
        buffer.put_slice(b"Connection: close\r\n\r\n");
        if !self.omit_body {
            buffer.put_slice(&self.body);
        }
        buffer.freeze()
    }
}
