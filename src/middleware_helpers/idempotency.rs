use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt as _;
use tracing::{error, info, warn};

use crate::{
    auth::tenant_from_parts, errors::ServiceError, services::idempotency::IdempotencyService,
    AppState,
};

pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";

const MAX_STORED_RESPONSE_BYTES: usize = 256 * 1024;

fn json_response(status: StatusCode, body: String) -> Response {
    let mut resp = Response::new(Body::from(body));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}

/// Wraps mutating routes so a retried request with the same
/// `Idempotency-Key` replays the first recorded response instead of
/// re-executing. Requests without the header pass through unprotected,
/// except on paths configured as requiring the key. The key row is only
/// written after a successful (2xx) response, so a failed operation can
/// be retried for real.
pub async fn idempotency_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if !state.config.idempotency.enabled {
        return next.run(req).await;
    }

    let method = req.method().clone();
    if !matches!(method.as_str(), "POST" | "PUT" | "PATCH" | "DELETE") {
        return next.run(req).await;
    }

    let path = req.uri().path().to_string();
    let key = req
        .headers()
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    let Some(key) = key else {
        let required = state
            .config
            .idempotency
            .required_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()));
        if required {
            return ServiceError::ValidationError(format!(
                "{} header is required on {}",
                IDEMPOTENCY_HEADER, path
            ))
            .into_response();
        }
        return next.run(req).await;
    };

    // Without a tenant the key cannot be scoped; the handler will reject
    // tenant-less requests on protected routes anyway.
    let (parts, body) = req.into_parts();
    let Some(tenant) = tenant_from_parts(&parts) else {
        return next.run(Request::from_parts(parts, body)).await;
    };

    // Buffer the request body so it can be hashed and then handed to the
    // handler untouched.
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!(error = %e, "Failed to buffer request body for idempotency");
            return ServiceError::InternalError("request body unreadable".to_string())
                .into_response();
        }
    };

    let request_hash = IdempotencyService::compute_request_hash(method.as_str(), &path, &bytes);
    let endpoint = format!("{} {}", method, path);

    match state.services.idempotency.find_key(&key, tenant).await {
        Ok(Some(stored)) => {
            if stored.request_hash == request_hash {
                info!(key = %key, endpoint = %endpoint, "replaying stored idempotent response");
                let status = StatusCode::from_u16(stored.response_status as u16)
                    .unwrap_or(StatusCode::OK);
                return json_response(status, stored.response_body);
            }
            return ServiceError::IdempotencyConflict(format!(
                "Key '{}' was already used with a different request",
                key
            ))
            .into_response();
        }
        Ok(None) => {}
        Err(e) => return e.into_response(),
    }

    let req = Request::from_parts(parts, Body::from(bytes));
    let resp = next.run(req).await;

    let (parts, body) = resp.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!(error = %e, "Failed to buffer response body for idempotency");
            return Response::from_parts(parts, Body::empty());
        }
    };

    // Only successful outcomes are pinned; errors stay retryable.
    if parts.status.is_success() && bytes.len() <= MAX_STORED_RESPONSE_BYTES {
        let body_text = String::from_utf8_lossy(&bytes).to_string();
        if let Err(e) = state
            .services
            .idempotency
            .store_key(
                &key,
                tenant,
                &endpoint,
                &request_hash,
                parts.status.as_u16(),
                &body_text,
            )
            .await
        {
            warn!(error = %e, key = %key, "Failed to record idempotency key");
        }
    } else if bytes.len() > MAX_STORED_RESPONSE_BYTES {
        warn!(
            key = %key,
            bytes = bytes.len(),
            "response too large to record for idempotent replay"
        );
    }

    Response::from_parts(parts, Body::from(bytes))
}
