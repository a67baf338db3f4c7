// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// certwerk-records: Client for the civil registry REST API.
//
// The client is built explicitly with its base URL, timeout and middleware
// stack; there is no shared global instance. Every response is funnelled
// through `ApiResponse` so callers see either a typed body or a typed error.

pub mod client;
pub mod envelope;
pub mod middleware;

pub use client::{RecordsClient, RecordsClientBuilder};
pub use envelope::ApiResponse;
pub use middleware::{BearerAuth, LogNotifier, Middleware, Notifier, NotifyOnError, RequestTimestamp};
