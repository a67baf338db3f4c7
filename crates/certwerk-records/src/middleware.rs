// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request middleware.
//
// Each middleware may decorate outgoing requests and observe failures. The
// stack is fixed when the client is built and runs in insertion order.

use std::sync::Arc;

use certwerk_core::error::CertwerkError;
use certwerk_core::human_errors::humanize_error;
use chrono::{SecondsFormat, Utc};
use reqwest::RequestBuilder;
use tracing::warn;

/// Header carrying the client-side send time of a request.
pub const REQUEST_TIMESTAMP_HEADER: &str = "x-request-timestamp";

pub trait Middleware: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
    }

    fn on_error(&self, _error: &CertwerkError) {}
}

/// Adds `Authorization: Bearer <token>`.
pub struct BearerAuth {
    token: String,
}

impl BearerAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Middleware for BearerAuth {
    fn name(&self) -> &'static str {
        "bearer-auth"
    }

    fn on_request(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.token)
    }
}

/// Stamps each request with its send time (RFC 3339, milliseconds).
pub struct RequestTimestamp;

impl Middleware for RequestTimestamp {
    fn name(&self) -> &'static str {
        "request-timestamp"
    }

    fn on_request(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(
            REQUEST_TIMESTAMP_HEADER,
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        )
    }
}

/// Where user-facing error notices go (a toast surface, a status line, ...).
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Notifier that writes to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        warn!(target: "certwerk::notice", "{message}");
    }
}

/// Reports every failed call to a `Notifier` as a plain-language message.
pub struct NotifyOnError {
    notifier: Arc<dyn Notifier>,
}

impl NotifyOnError {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

impl Middleware for NotifyOnError {
    fn name(&self) -> &'static str {
        "notify-on-error"
    }

    fn on_error(&self, error: &CertwerkError) {
        self.notifier.notify(&humanize_error(error).one_line());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    impl Notifier for Collect {
        fn notify(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_owned());
        }
    }

    fn request() -> RequestBuilder {
        reqwest::Client::new().get("http://registry.invalid/api/births/")
    }

    #[test]
    fn bearer_auth_sets_the_header() {
        let built = BearerAuth::new("t0k3n").on_request(request()).build().unwrap();
        assert_eq!(
            built.headers().get(reqwest::header::AUTHORIZATION).unwrap(),
            "Bearer t0k3n"
        );
    }

    #[test]
    fn timestamp_header_is_rfc3339() {
        let built = RequestTimestamp.on_request(request()).build().unwrap();
        let value = built.headers().get(REQUEST_TIMESTAMP_HEADER).unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(value.to_str().unwrap()).is_ok());
    }

    #[test]
    fn errors_reach_the_notifier_in_plain_language() {
        let sink = Arc::new(Collect::default());
        let middleware = NotifyOnError::new(sink.clone());
        middleware.on_error(&CertwerkError::Api {
            status: 401,
            message: "token expired".into(),
        });
        let notices = sink.0.lock().unwrap();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].starts_with("Session expired."));
    }

    #[test]
    fn default_hooks_do_nothing() {
        let built = NotifyOnError::new(Arc::new(LogNotifier))
            .on_request(request())
            .build()
            .unwrap();
        assert!(built.headers().is_empty());
    }
}
