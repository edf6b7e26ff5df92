//! HTTP surface for the engine. Identity arrives pre-validated in
//! `x-user-id`/`x-user-role` headers (session issuance happens upstream);
//! missing or unrecognized claims fall back to the guest role and the policy
//! table fails closed from there.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::directory::{DirectoryError, ListingDirectory};
use super::domain::{Actor, ListingDraft, ListingId, ListingPatch, ResourceKind, Role};
use super::filter::{CategoryFilter, FilterState, StatusFilter};
use super::hub::ListingHub;
use super::lifecycle::TransitionAction;
use super::scope::{CreatorView, SeekerTab, ViewSelector};
use super::session::WorkflowError;

/// Router builder exposing the listing workflow for both catalogues.
pub fn listing_router<D>(hub: Arc<ListingHub<D>>) -> Router
where
    D: ListingDirectory + 'static,
{
    Router::new()
        .route(
            "/api/v1/:kind/listings",
            get(list_handler::<D>).post(create_handler::<D>),
        )
        .route(
            "/api/v1/:kind/listings/:id",
            get(get_handler::<D>)
                .patch(update_handler::<D>)
                .delete(delete_handler::<D>),
        )
        .route(
            "/api/v1/:kind/listings/:id/:action",
            post(transition_handler::<D>),
        )
        .route("/api/v1/:kind/saved", get(saved_handler::<D>))
        .route(
            "/api/v1/:kind/saved/:id/toggle",
            post(toggle_saved_handler::<D>),
        )
        .with_state(hub)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    view: Option<String>,
    #[serde(default)]
    tab: Option<String>,
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TransitionBody {
    #[serde(default)]
    reason: Option<String>,
}

fn actor_from_headers(headers: &HeaderMap) -> Actor {
    let user_id = headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("anonymous");
    let role = headers
        .get("x-user-role")
        .and_then(|value| value.to_str().ok())
        .map(Role::from_claim)
        .unwrap_or(Role::Guest);
    Actor::new(user_id, role)
}

fn parse_kind(segment: &str) -> Result<ResourceKind, Response> {
    segment.parse::<ResourceKind>().map_err(|_| {
        let payload = json!({ "error": format!("unknown catalogue: {segment}") });
        (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
    })
}

fn selector_from_query(query: &ListQuery) -> Option<ViewSelector> {
    if let Some(view) = query.view.as_deref() {
        let view = match view.trim().to_ascii_lowercase().as_str() {
            "mine" => Some(CreatorView::Mine),
            "all" => Some(CreatorView::All),
            "pending" => Some(CreatorView::Pending),
            _ => None,
        };
        if let Some(view) = view {
            return Some(ViewSelector::View(view));
        }
    }
    if let Some(tab) = query.tab.as_deref() {
        let tab = match tab.trim().to_ascii_lowercase().as_str() {
            "active" => Some(SeekerTab::Active),
            "saved" => Some(SeekerTab::Saved),
            _ => None,
        };
        if let Some(tab) = tab {
            return Some(ViewSelector::Tab(tab));
        }
    }
    None
}

fn filters_from_query(query: &ListQuery) -> FilterState {
    FilterState {
        search: query.q.clone().unwrap_or_default(),
        status: query
            .status
            .as_deref()
            .map(StatusFilter::from_param)
            .unwrap_or_default(),
        category: query
            .category
            .as_deref()
            .map(CategoryFilter::from_param)
            .unwrap_or_default(),
        saved_only: false,
    }
}

fn workflow_error_response(error: WorkflowError) -> Response {
    let status = match &error {
        WorkflowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowError::Forbidden { .. } => StatusCode::FORBIDDEN,
        WorkflowError::IllegalTransition { .. } => StatusCode::CONFLICT,
        WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::Directory(DirectoryError::NotFound) => StatusCode::NOT_FOUND,
        WorkflowError::Directory(_) => StatusCode::BAD_GATEWAY,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn list_handler<D>(
    State(hub): State<Arc<ListingHub<D>>>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response
where
    D: ListingDirectory + 'static,
{
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    let actor = actor_from_headers(&headers);
    let session = hub.session(&actor, kind).await;

    let resolution = match session.open(selector_from_query(&query)).await {
        Ok(resolution) => resolution,
        Err(error) => return workflow_error_response(error),
    };
    session.set_filters(filters_from_query(&query));
    if let Some(page) = query.page.filter(|page| *page > 1) {
        if let Err(error) = session.goto_page(page).await {
            return workflow_error_response(error);
        }
    }

    let (axis, value) = resolution.selector.query_pair();
    let mut selector = serde_json::Map::new();
    selector.insert(axis.to_string(), json!(value));
    let payload = json!({
        "scope": resolution.scope,
        "selector": selector,
        "redirected": resolution.redirected,
        "items": session.visible(),
        "pagination": session.pagination(),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn create_handler<D>(
    State(hub): State<Arc<ListingHub<D>>>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    axum::Json(draft): axum::Json<ListingDraft>,
) -> Response
where
    D: ListingDirectory + 'static,
{
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    let actor = actor_from_headers(&headers);
    let session = hub.session(&actor, kind).await;

    match session.create(draft).await {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn get_handler<D>(
    State(hub): State<Arc<ListingHub<D>>>,
    Path((kind, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response
where
    D: ListingDirectory + 'static,
{
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    let actor = actor_from_headers(&headers);
    let session = hub.session(&actor, kind).await;

    match session.lookup(&ListingId(id)).await {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn update_handler<D>(
    State(hub): State<Arc<ListingHub<D>>>,
    Path((kind, id)): Path<(String, String)>,
    headers: HeaderMap,
    axum::Json(patch): axum::Json<ListingPatch>,
) -> Response
where
    D: ListingDirectory + 'static,
{
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    let actor = actor_from_headers(&headers);
    let session = hub.session(&actor, kind).await;

    match session.update(&ListingId(id), patch).await {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn delete_handler<D>(
    State(hub): State<Arc<ListingHub<D>>>,
    Path((kind, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response
where
    D: ListingDirectory + 'static,
{
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    let actor = actor_from_headers(&headers);
    let session = hub.session(&actor, kind).await;

    match session.delete(&ListingId(id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn transition_handler<D>(
    State(hub): State<Arc<ListingHub<D>>>,
    Path((kind, id, action)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Option<axum::Json<TransitionBody>>,
) -> Response
where
    D: ListingDirectory + 'static,
{
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    let action = match action.parse::<TransitionAction>() {
        Ok(action) => action,
        Err(message) => {
            let payload = json!({ "error": message });
            return (StatusCode::NOT_FOUND, axum::Json(payload)).into_response();
        }
    };
    let actor = actor_from_headers(&headers);
    let session = hub.session(&actor, kind).await;
    let id = ListingId(id);
    let reason = body.and_then(|axum::Json(body)| body.reason);

    let result = match action {
        TransitionAction::Approve => session.approve(&id).await,
        TransitionAction::Reject => session.reject(&id, reason.as_deref().unwrap_or("")).await,
        TransitionAction::Unpublish => session.unpublish(&id).await,
        TransitionAction::Republish => session.republish(&id).await,
    };

    match result {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn saved_handler<D>(
    State(hub): State<Arc<ListingHub<D>>>,
    Path(kind): Path<String>,
    headers: HeaderMap,
) -> Response
where
    D: ListingDirectory + 'static,
{
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    let actor = actor_from_headers(&headers);
    let session = hub.session(&actor, kind).await;

    let payload = json!({ "saved": session.saved() });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn toggle_saved_handler<D>(
    State(hub): State<Arc<ListingHub<D>>>,
    Path((kind, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response
where
    D: ListingDirectory + 'static,
{
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    let actor = actor_from_headers(&headers);
    let session = hub.session(&actor, kind).await;

    match session.toggle_saved(&ListingId(id)).await {
        Ok(saved) => (StatusCode::OK, axum::Json(json!({ "saved": saved }))).into_response(),
        Err(error) => workflow_error_response(error),
    }
}
