//! API middleware
//!
//! Attaches an operation context to every request. The context travels
//! into event metadata on the command path.

use std::net::SocketAddr;

use axum::extract::connect_info::ConnectInfo;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::domain::OperationContext;

/// Insert an `OperationContext` with a fresh correlation id
pub async fn request_context_middleware(mut request: Request, next: Next) -> Response {
    let mut context = OperationContext::new();
    let correlation_id = context.ensure_correlation_id();

    if let Some(connect_info) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        context = context.with_client_ip(connect_info.0.ip());
    }

    tracing::debug!(%correlation_id, path = %request.uri().path(), "request context attached");

    request.extensions_mut().insert(context);
    next.run(request).await
}
