use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{MatchedPath, RawPathParams, Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use super::headers::CorrelationId;
use crate::audit::record::{not_logged, redact};
use crate::audit::{decode_unverified_claims, username_claim, AuditRecord, AuditRequest, AuditResponse};
use crate::auth::CallerIdentity;
use crate::error::ApiError;
use crate::state::AppState;

fn is_mutating(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

/// JSON bodies are kept (with credentials redacted); anything else is null.
fn json_body(bytes: &Bytes) -> Option<Value> {
    let mut value = serde_json::from_slice::<Value>(bytes).ok()?;
    redact(&mut value);
    Some(value)
}

/// Reads up to `cap` bytes for the audit record. Bodies that are larger or
/// fail mid-stream are forwarded untouched (the bytes already read, then the
/// rest of the stream) and recorded as null, leaving the status to the
/// extractors downstream.
async fn capture_body(body: Body, cap: usize) -> (Option<Bytes>, Body) {
    let mut chunks = body.into_data_stream();
    let mut buffered: Vec<u8> = Vec::new();

    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(chunk) => {
                buffered.extend_from_slice(&chunk);
                if buffered.len() > cap {
                    tracing::debug!("Request body exceeds {} bytes, not captured for audit", cap);
                    let head = stream::iter([Ok::<_, axum::Error>(Bytes::from(buffered))]);
                    return (None, Body::from_stream(head.chain(chunks)));
                }
            }
            Err(e) => {
                tracing::warn!("Request body could not be read for audit: {}", e);
                let replay = stream::iter([Ok(Bytes::from(buffered)), Err(e)]);
                return (None, Body::from_stream(replay));
            }
        }
    }

    let bytes = Bytes::from(buffered);
    (Some(bytes.clone()), Body::from(bytes))
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| (name.to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
        .collect()
}

fn query_map(query: Option<&str>) -> BTreeMap<String, String> {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Audit interceptor: captures the request before the capability guard runs
/// and emits exactly one record once the response is known.
pub async fn audit_requests(
    State(state): State<AppState>,
    matched: Option<MatchedPath>,
    path_params: Option<RawPathParams>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let correlation_id = request
        .extensions()
        .get::<CorrelationId>()
        .map(|id| id.0)
        .unwrap_or_else(Uuid::new_v4);
    let mut record = AuditRecord::pending(correlation_id);

    let (parts, body) = request.into_parts();
    let mutating = is_mutating(&parts.method);
    let claims = decode_unverified_claims(&parts.headers);

    let (request_body, body) = if mutating {
        let (captured, body) = capture_body(body, state.config.api.max_request_size_bytes).await;
        (captured.as_ref().and_then(json_body), body)
    } else {
        (None, body)
    };

    let fallback_username = username_claim(&claims);
    record.capture_request(
        matched.as_ref().map(|m| m.as_str().to_string()),
        AuditRequest {
            method: parts.method.to_string(),
            url: parts.uri.to_string(),
            query_params: query_map(parts.uri.query()),
            path_params: path_params
                .map(|params| params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
                .unwrap_or_default(),
            claims,
            body: request_body,
        },
    );

    let response = next.run(Request::from_parts(parts, body)).await;

    let caller = response
        .extensions()
        .get::<Arc<CallerIdentity>>()
        .map(|identity| identity.username.clone())
        .or(fallback_username);
    let status = response.status();
    let headers = header_map(response.headers());

    if !mutating {
        record.complete(
            caller,
            AuditResponse {
                status: status.as_u16(),
                headers,
                body: not_logged(),
            },
            elapsed_ms(started),
        );
        state.audit.emit(record);
        return response;
    }

    let (parts, body) = response.into_parts();
    match to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            record.complete(
                caller,
                AuditResponse {
                    status: status.as_u16(),
                    headers,
                    body: json_body(&bytes).unwrap_or(Value::Null),
                },
                elapsed_ms(started),
            );
            state.audit.emit(record);
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(e) => {
            tracing::error!("Response body could not be read: {}", e);
            record.fail(caller, status.as_u16(), headers, elapsed_ms(started));
            state.audit.emit(record);
            ApiError::internal_server_error("Response body could not be read").into_response()
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
