//! HTTP handlers
//!
//! Thin adapters: extract, call one service method, wrap the result in the
//! `{"success": true, ...}` envelope.

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, PathRejection, QueryRejection};
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use axum::Json;
use dycetix_core::{RequestMeta, RequirementId};
use dycetix_service::{ListQuery, ServiceError, SubmissionPayload};
use serde_json::{json, Value};
use std::net::SocketAddr;

type ApiResult = Result<Json<Value>, ApiError>;

/// `POST /api/forms/submit/client-requirement`
pub(crate) async fn submit_requirement(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult {
    let body = body?;
    let payload = SubmissionPayload::from_slice(&body)?;
    let meta = RequestMeta::new(
        peer.map(|ConnectInfo(addr)| addr.ip().to_string()),
        headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    );

    let receipt = state.intake.submit(payload, meta).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Form submitted successfully",
        "submission_id": receipt.submission_id(),
        "attachments_count": receipt.attachments_count(),
        "submission_date": receipt.submission_date().to_rfc3339(),
    })))
}

/// `GET /api/forms/client-requirements`
pub(crate) async fn list_requirements(
    State(state): State<AppState>,
    admin: Authenticated,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let listing = state.triage.list(&admin.actor(), &query).await?;
    Ok(Json(json!({
        "success": true,
        "data": listing.items,
        "counts": listing.counts,
        "total_count": listing.total,
        "limit": listing.limit,
        "offset": listing.offset,
    })))
}

/// `GET /api/forms/client-requirements/:id`
pub(crate) async fn requirement_detail(
    State(state): State<AppState>,
    admin: Authenticated,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult {
    let id = requirement_id(id)?;
    let detail = state.triage.detail(&admin.actor(), id).await?;
    Ok(Json(json!({ "success": true, "data": detail })))
}

/// `PATCH /api/forms/client-requirements/:id`
pub(crate) async fn update_requirement(
    State(state): State<AppState>,
    admin: Authenticated,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult {
    let id = requirement_id(id)?;
    let body = body?;
    let body: Value = serde_json::from_slice(&body)
        .map_err(|err| ServiceError::MalformedPayload(err.to_string()))?;
    let summary = state.triage.update_json(&admin.actor(), id, &body).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Updated successfully",
        "data": summary,
    })))
}

/// `GET /api/forms/client-requirements/stats`
pub(crate) async fn requirement_stats(
    State(state): State<AppState>,
    _admin: Authenticated,
) -> ApiResult {
    let stats = state.triage.stats().await?;
    Ok(Json(json!({ "success": true, "data": stats })))
}

/// `GET /api/forms/client-requirements/recent`
pub(crate) async fn recent_requirements(
    State(state): State<AppState>,
    admin: Authenticated,
) -> ApiResult {
    let recent = state.triage.recent(&admin.actor()).await?;
    Ok(Json(json!({ "success": true, "data": recent })))
}

/// `GET /api/forms/admin/stats`
pub(crate) async fn dashboard_stats(
    State(state): State<AppState>,
    _admin: Authenticated,
) -> ApiResult {
    let stats = state.triage.dashboard().await?;
    Ok(Json(json!({ "success": true, "data": stats })))
}

/// `GET /api/forms/admin/sidebar-stats`
pub(crate) async fn sidebar_stats(
    State(state): State<AppState>,
    _admin: Authenticated,
) -> ApiResult {
    let stats = state.triage.sidebar().await?;
    Ok(Json(json!({
        "success": true,
        "new_forms": stats.new_forms,
        "alerts": stats.alerts,
    })))
}

/// `GET /api/forms/admin/health`
pub(crate) async fn health(State(state): State<AppState>, _admin: Authenticated) -> ApiResult {
    let report = state.triage.health().await;
    Ok(Json(json!({ "success": true, "data": report })))
}

/// `GET /api/forms/admin/notifications/unread-count`
pub(crate) async fn unread_count(
    State(state): State<AppState>,
    _admin: Authenticated,
) -> ApiResult {
    Ok(Json(json!({
        "success": true,
        "count": state.triage.unread_count(),
    })))
}

// a non-numeric id cannot name a requirement
fn requirement_id(id: Result<Path<i64>, PathRejection>) -> Result<RequirementId, ApiError> {
    match id {
        Ok(Path(id)) => Ok(RequirementId(id)),
        Err(_) => Err(ServiceError::NotFound("Client requirement not found".to_string()).into()),
    }
}
