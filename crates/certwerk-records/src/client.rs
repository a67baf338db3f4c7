// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Registry REST client.
//
// Endpoints (relative to the base URL, which includes the `/api` prefix):
//
//   GET /{collection}/           list, `?search=` filters by substring
//   GET /{collection}/{id}       single record
//
// `collection` is `births`, `deaths`, `marriages` or `divorces`.

use std::sync::Arc;
use std::time::Duration;

use certwerk_core::config::IssuerConfig;
use certwerk_core::error::{CertwerkError, Result};
use certwerk_core::lookup::RecordLookup;
use certwerk_core::types::{CertificateRecord, RecordType};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::envelope::{ApiResponse, extract_list};
use crate::middleware::Middleware;

/// Builder for [`RecordsClient`].
pub struct RecordsClientBuilder {
    base_url: String,
    timeout: Duration,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl RecordsClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Append a middleware; they run in the order added.
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn build(self) -> Result<RecordsClient> {
        let http = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|err| CertwerkError::Network(format!("cannot build HTTP client: {err}")))?;
        Ok(RecordsClient {
            http,
            base_url: self.base_url.trim_end_matches('/').to_owned(),
            middleware: self.middleware,
        })
    }
}

/// Client for the registry API.
pub struct RecordsClient {
    http: Client,
    base_url: String,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl RecordsClient {
    pub fn builder(base_url: impl Into<String>) -> RecordsClientBuilder {
        RecordsClientBuilder {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            middleware: Vec::new(),
        }
    }

    /// Base URL and timeout from `config`, no middleware.
    pub fn builder_from_config(config: &IssuerConfig) -> RecordsClientBuilder {
        Self::builder(config.registry_url.clone()).timeout(config.registry_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request through the middleware stack and validate the answer.
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let mut request: RequestBuilder = self.http.get(self.url(path)).query(query);
        for middleware in &self.middleware {
            request = middleware.on_request(request);
        }

        let result = self.execute(request).await;
        if let Err(err) = &result {
            for middleware in &self.middleware {
                middleware.on_error(err);
            }
        }
        result
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(transport_error)?;
        debug!(status, bytes = body.len(), "registry responded");
        ApiResponse::<Value>::from_parts(status, &body)?.into_result()
    }

    /// Fetch one record by its registry id.
    #[instrument(skip(self), fields(record_type = %record_type))]
    pub async fn fetch_record(&self, record_type: RecordType, id: &str) -> Result<CertificateRecord> {
        let path = format!("{}/{}", record_type.api_collection(), id);
        let body = self.get_json(&path, &[]).await?;
        let record = normalize_record(record_type, body)?;
        info!(id = %record.id, "record fetched");
        Ok(record)
    }

    /// Find the record carrying exactly `certificate_number`.
    ///
    /// The registry's search is a substring match, so the listing is filtered
    /// for an exact number and the full record is then fetched by id.
    #[instrument(skip(self), fields(record_type = %record_type))]
    pub async fn search_by_certificate(
        &self,
        record_type: RecordType,
        certificate_number: &str,
    ) -> Result<Option<CertificateRecord>> {
        let wanted = certificate_number.trim();
        let path = format!("{}/", record_type.api_collection());
        let body = self.get_json(&path, &[("search", wanted)]).await?;

        let summary = extract_list(record_type, &body)?
            .into_iter()
            .map(|item| normalize_record(record_type, item))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .find(|record| record.certificate_number() == Some(wanted));

        match summary {
            Some(summary) => {
                debug!(id = %summary.id, "certificate found in listing");
                self.fetch_record(record_type, &summary.id).await.map(Some)
            }
            None => {
                info!("no record carries this certificate number");
                Ok(None)
            }
        }
    }
}

impl RecordLookup for RecordsClient {
    async fn find_by_certificate(
        &self,
        record_type: RecordType,
        certificate_number: &str,
    ) -> Result<Option<CertificateRecord>> {
        self.search_by_certificate(record_type, certificate_number)
            .await
    }
}

fn transport_error(err: reqwest::Error) -> CertwerkError {
    if err.is_timeout() {
        CertwerkError::Network(format!("request timed out: {err}"))
    } else if err.is_decode() {
        CertwerkError::Decoding(err.to_string())
    } else {
        CertwerkError::Network(err.to_string())
    }
}

/// Bring the registry's id spellings (`id`, `_id`, `{"$oid": ...}`,
/// `birth_id`, ...) down to a single `id` field.
fn normalize_record(record_type: RecordType, mut body: Value) -> Result<CertificateRecord> {
    if let Some(object) = body.as_object_mut() {
        let typed_key = format!("{}_id", record_type.as_str());
        let raw_id = object.remove("_id");
        if !object.contains_key("id") {
            let id = raw_id
                .map(|value| match value {
                    Value::Object(mut inner) => inner.remove("$oid").unwrap_or(Value::Null),
                    other => other,
                })
                .filter(|value| !value.is_null())
                .or_else(|| object.get(&typed_key).cloned());
            if let Some(id) = id {
                object.insert("id".into(), id);
            }
        }
    }
    CertificateRecord::from_registry_json(record_type, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{Notifier, NotifyOnError, RequestTimestamp};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    impl Notifier for Collect {
        fn notify(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_owned());
        }
    }

    #[test]
    fn base_url_is_normalized() {
        let client = RecordsClient::builder("http://localhost:5000/api/").build().unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000/api");
        assert_eq!(client.url("/births/"), "http://localhost:5000/api/births/");
    }

    #[test]
    fn middleware_keeps_insertion_order() {
        let client = RecordsClient::builder("http://x")
            .with(RequestTimestamp)
            .with(NotifyOnError::new(Arc::new(Collect::default())))
            .build()
            .unwrap();
        assert_eq!(client.middleware_names(), ["request-timestamp", "notify-on-error"]);
    }

    #[test]
    fn config_supplies_url() {
        let config = IssuerConfig::default();
        let client = RecordsClient::builder_from_config(&config).build().unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000/api");
    }

    #[test]
    fn every_id_spelling_normalizes() {
        let cases = [
            json!({"_id": "a1", "certificate_number": "BC-1"}),
            json!({"_id": {"$oid": "a1"}}),
            json!({"birth_id": "a1", "certificate_number": "BC-1"}),
            json!({"id": "a1", "_id": "ignored"}),
        ];
        for body in cases {
            let record = normalize_record(RecordType::Birth, body.clone()).unwrap();
            assert_eq!(record.id, "a1", "{body}");
        }
    }

    #[test]
    fn missing_id_is_a_decoding_error() {
        let result = normalize_record(RecordType::Death, json!({"certificate_number": "DC-1"}));
        assert!(matches!(result, Err(CertwerkError::Decoding(_))));
    }

    #[tokio::test]
    async fn unreachable_registry_is_a_network_error_and_notifies() {
        let sink = Arc::new(Collect::default());
        let client = RecordsClient::builder("http://127.0.0.1:1/api")
            .timeout(Duration::from_secs(2))
            .with(NotifyOnError::new(sink.clone()))
            .build()
            .unwrap();

        let err = client.fetch_record(RecordType::Birth, "abc").await.unwrap_err();
        assert!(matches!(err, CertwerkError::Network(_)));
        assert_eq!(sink.0.lock().unwrap().len(), 1);
    }
}
