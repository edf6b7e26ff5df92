use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use souk::listings::{listing_router, ListingDirectory, ListingHub};

use crate::infra::AppState;

pub(crate) fn with_listing_routes<D>(hub: Arc<ListingHub<D>>) -> axum::Router
where
    D: ListingDirectory + 'static,
{
    listing_router(hub)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use souk::listings::SessionSettings;
    use tower::util::ServiceExt;

    use crate::infra::InMemoryListingDirectory;

    fn test_router() -> axum::Router {
        let directory = Arc::new(InMemoryListingDirectory::default());
        let hub = Arc::new(ListingHub::new(
            directory,
            SessionSettings::default(),
            None,
        ));
        with_listing_routes(hub)
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn listing_routes_are_mounted() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/properties/listings")
                    .header("x-user-id", "owner-1")
                    .header("x-user-role", "landlord")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_catalogue_is_a_404() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/vehicles/listings")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
