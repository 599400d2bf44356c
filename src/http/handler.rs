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
use tracing::{debug, warn};

use crate::network::RequestHandler;
use crate::service::HttpConfig;
use crate::{AppError, AppResult};

use super::request::HttpRequest;
use super::response::{HttpResponse, StatusCode};

const CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Serves one fixed page for `GET` and `HEAD` on any path.
#[derive(Debug, Clone)]
pub struct HttpHandler {
    server_name: String,
    body: Bytes,
}

impl HttpHandler {
    pub fn new(config: &HttpConfig) -> Self {
        HttpHandler {
            server_name: config.server_name.clone(),
            body: Bytes::from(config.body.clone()),
        }
    }

    fn respond(&self, request: &HttpRequest) -> HttpResponse {
        let response = HttpResponse::new(StatusCode::Ok)
            .with_header("Server", &self.server_name)
            .with_header("Content-Type", CONTENT_TYPE);
        match request.method.as_str() {
            "GET" => response.with_body(self.body.clone()),
            "HEAD" => response.with_body(self.body.clone()).without_body(),
            _ => HttpResponse::new(StatusCode::MethodNotAllowed)
                .with_header("Server", &self.server_name)
                .with_header("Allow", "GET, HEAD"),
        }
    }
}

impl RequestHandler for HttpHandler {
    fn is_complete(&self, received: &[u8]) -> bool {
        match HttpRequest::check(received) {
            Ok(()) => true,
            Err(AppError::Incomplete) => false,
            // nothing more will make it parse, answer with 400 right away
            Err(_) => true,
        }
    }

    fn handle(&mut self, request: &[u8]) -> AppResult<Bytes> {
        let response = match HttpRequest::parse(request) {
            Ok(request) => {
                debug!(method = %request.method, path = %request.path, "http request");
                self.respond(&request)
            }
            Err(err) => {
                warn!(cause = %err, "failed to parse http request");
                HttpResponse::new(StatusCode::BadRequest)
                    .with_header("Server", &self.server_name)
                    .with_header("Content-Type", "text/plain; charset=utf-8")
                    .with_body(Bytes::from(format!("Invalid: {err}\n")))
            }
        };
        Ok(response.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> HttpHandler {
        HttpHandler::new(&HttpConfig {
            server_name: "test".to_string(),
            body: "page".to_string(),
        })
    }

    fn respond(request: &[u8]) -> String {
        let bytes = handler().handle(request).unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_framing() {
        let handler = handler();
        assert!(!handler.is_complete(b"GET / HTTP/1.0\r\n"));
        assert!(handler.is_complete(b"GET / HTTP/1.0\r\n\r\n"));
        // malformed heads are complete, the handler answers 400
        assert!(handler.is_complete(b"GET / HTTP/1.0\r\nContent-Length: x\r\n\r\n"));
    }

    #[test]
    fn test_get_serves_page() {
        let text = respond(b"GET /anything HTTP/1.0\r\n\r\n");
        assert!(text.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(text.contains("Server: test\r\n"));
        assert!(text.ends_with("\r\n\r\npage"));
    }

    #[test]
    fn test_head_has_no_body() {
        let text = respond(b"HEAD / HTTP/1.0\r\n\r\n");
        assert!(text.contains("Content-Length: 4\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_other_methods_are_not_allowed() {
        let text = respond(b"DELETE / HTTP/1.0\r\n\r\n");
        assert!(text.starts_with("HTTP/1.0 405 Method Not Allowed\r\n"));
        assert!(text.contains("Allow: GET, HEAD\r\n"));
    }

    #[test]
    fn test_garbage_is_bad_request() {
        let text = respond(b"\x00\x01\x02\x03garbage\r\n\r\n");
        assert!(text.starts_with("HTTP/1.0 400 Bad Request\r\n"));
        assert!(text.contains("Invalid:"));
    }
}
