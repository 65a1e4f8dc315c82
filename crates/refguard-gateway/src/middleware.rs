//! Delete guard middleware.

use axum::{
    body::{self, Body},
    extract::{OriginalUri, Request, State},
    middleware::Next,
    response::Response,
};
use refguard_core::{DeleteRequest, Verdict};
use tracing::{debug, error};

use crate::error::AppError;
use crate::GuardState;

/// Refuse delete-style requests whose rows are still referenced.
///
/// The body is buffered only for batch deletes and handed on unchanged.
/// Policies match the full request path, also when the router is nested.
pub async fn protect_deletes(
    State(state): State<GuardState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let delete_request = DeleteRequest::new(request.method().as_str(), request_path(&request));
    if !delete_request.is_candidate() {
        return Ok(next.run(request).await);
    }

    let (request, delete_request) = if delete_request.batch_delete_module().is_some() {
        let (parts, body) = request.into_parts();
        let bytes = body::to_bytes(body, state.config.max_body_bytes)
            .await
            .map_err(|err| AppError::BadRequest(format!("failed to read request body: {}", err)))?;
        let delete_request = delete_request.with_body(bytes.to_vec());
        (Request::from_parts(parts, Body::from(bytes)), delete_request)
    } else {
        (request, delete_request)
    };

    let verdict = state.protection.protect(&delete_request).await.map_err(|err| {
        if !err.is_bad_request() {
            error!(
                error = %err,
                method = %delete_request.method,
                path = %delete_request.path,
                "delete protection failed"
            );
        }
        AppError::from(err)
    })?;

    match verdict {
        Verdict::Allowed => Ok(next.run(request).await),
        Verdict::Blocked { total } => {
            debug!(path = %delete_request.path, total = total, "refused delete");
            Err(AppError::InUse(state.config.in_use_message.clone()))
        }
    }
}

/// Path as received by the server, before any `Router::nest` prefix stripping.
fn request_path(request: &Request) -> String {
    match request.extensions().get::<OriginalUri>() {
        Some(OriginalUri(uri)) => uri.path().to_string(),
        None => request.uri().path().to_string(),
    }
}
