use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Path, State, rejection::PathRejection},
    http::{HeaderValue, StatusCode, Uri, header::CONTENT_TYPE},
    middleware,
    response::Response,
    routing::get,
};

use tracing::debug;

use crate::application::{
    error::ErrorReport,
    router::{RequestRouter, RoutedResponse},
};

use super::middleware::{log_responses, set_request_context};

const SOURCE: &str = "infra::http::public";

#[derive(Clone)]
pub struct HttpState {
    pub router: Arc<RequestRouter>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/{*path}", get(content))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn index(State(state): State<HttpState>) -> Response {
    into_response(state.router.handle_request("").await)
}

async fn content(
    State(state): State<HttpState>,
    uri: Uri,
    path: Result<Path<String>, PathRejection>,
) -> Response {
    let path = match path {
        Ok(Path(path)) => path,
        Err(rejection) => {
            // Undecodable paths still go through the router and end in the 404 flow.
            debug!(
                target = "marginalia::http::public",
                path = uri.path(),
                error = %rejection,
                "request path could not be percent-decoded"
            );
            uri.path().to_string()
        }
    };
    into_response(state.router.handle_request(&path).await)
}

fn into_response(routed: RoutedResponse) -> Response {
    let RoutedResponse {
        body,
        content_type,
        status,
        failure,
    } = routed;

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    if let Ok(value) = HeaderValue::from_str(&content_type) {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }

    if status == StatusCode::NOT_FOUND {
        let report = match failure {
            Some(err) => ErrorReport::from_error(SOURCE, status, &err),
            None => ErrorReport::from_message(SOURCE, status, "Content not found"),
        };
        report.attach(&mut response);
    }

    response
}
