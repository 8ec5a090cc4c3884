//! # Validation Layer
//!
//! A tower [`Layer`] that validates one request section against a compiled
//! validator before the wrapped service runs. The validator is resolved when
//! the layer is built, never per request.
//!
//! Per request the section is read into a JSON value, normalized and
//! validated. On success the value lands in [`ValidatedSections`] and the
//! request continues; on failure the layer answers 400 itself.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::extract::{FromRequestParts, Query, RawPathParams, Request};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};
use tower::{Layer, Service};
use vkit_core::Section;
use vkit_schema::{bad_request, CompiledValidator};

use crate::error::ApiError;
use crate::extract::ValidatedSections;
use crate::metrics;

/// Default request body limit: 2 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Tower layer that validates `section` of every request.
#[derive(Debug, Clone)]
pub struct ValidationLayer {
    section: Section,
    validator: Arc<CompiledValidator>,
    body_limit: usize,
}

impl ValidationLayer {
    pub fn new(section: Section, validator: Arc<CompiledValidator>) -> Self {
        Self {
            section,
            validator,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Overrides the body limit. Only the `body` section reads the body.
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn section(&self) -> Section {
        self.section
    }

    pub fn validator(&self) -> &Arc<CompiledValidator> {
        &self.validator
    }
}

impl<S> Layer<S> for ValidationLayer {
    type Service = ValidationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ValidationService {
            inner,
            layer: self.clone(),
        }
    }
}

/// Service wrapper produced by [`ValidationLayer`].
#[derive(Debug, Clone)]
pub struct ValidationService<S> {
    inner: S,
    layer: ValidationLayer,
}

impl<S> Service<Request> for ValidationService<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        // The readied service handles this request; the clone waits for the next.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let layer = self.layer.clone();

        Box::pin(async move {
            match validate_request(req, &layer).await {
                Ok(req) => inner.call(req).await,
                Err(err) => Ok(err.into_response()),
            }
        })
    }
}

async fn validate_request(req: Request, layer: &ValidationLayer) -> Result<Request, ApiError> {
    let section = layer.section;
    let (mut parts, body) = req.into_parts();

    let (mut value, body) = match section {
        Section::Body => {
            let bytes = read_body(body, layer.body_limit).await?;
            let value = match parse_body(&bytes) {
                Ok(value) => value,
                Err(e) => {
                    metrics::record(section, metrics::Outcome::Malformed);
                    return Err(ApiError::malformed_body(e));
                }
            };
            (value, Body::from(bytes))
        }
        Section::Query => (query_value(&parts), body),
        Section::Params => (params_value(&mut parts).await, body),
    };

    if let Err(failures) = layer.validator.check(&mut value) {
        metrics::record(section, metrics::Outcome::Invalid);
        tracing::debug!(
            section = %section,
            uri = %parts.uri,
            failures = failures.len(),
            "request rejected by schema"
        );
        return Err(ApiError::Invalid {
            section,
            body: bad_request(section, &failures),
        });
    }
    metrics::record(section, metrics::Outcome::Valid);

    match parts.extensions.get_mut::<ValidatedSections>() {
        Some(sections) => sections.insert(section, value),
        None => {
            let mut sections = ValidatedSections::default();
            sections.insert(section, value);
            parts.extensions.insert(sections);
        }
    }
    Ok(Request::from_parts(parts, body))
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, ApiError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        let inner = e.into_inner();
        if inner.is::<http_body_util::LengthLimitError>() {
            ApiError::PayloadTooLarge { limit }
        } else {
            ApiError::BodyRead(inner.to_string())
        }
    })
}

/// An empty or all-whitespace body reads as `{}`.
fn parse_body(bytes: &[u8]) -> Result<Value, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes)
}

/// Query pairs as an object of strings; a repeated key becomes an array.
fn query_value(parts: &Parts) -> Value {
    let pairs = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
        .map(|Query(pairs)| pairs)
        .unwrap_or_default();
    let mut object = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value);
        match object.get_mut(&key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                object.insert(key, value);
            }
        }
    }
    Value::Object(object)
}

/// Matched path parameters as an object of strings; empty outside a route
/// with parameters.
async fn params_value(parts: &mut Parts) -> Value {
    let mut object = Map::new();
    if let Ok(params) = RawPathParams::from_request_parts(parts, &()).await {
        for (key, value) in params.iter() {
            object.insert(key.to_string(), Value::String(value.to_string()));
        }
    }
    Value::Object(object)
}
