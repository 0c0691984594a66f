//! Scan-type catalog handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::extractors::JsonBody,
    auth::AdminPrincipal,
    models::{NewScanType, ScanTypePayload},
    state::AppState,
    Error, Result,
};

/// `GET /scans/types` - public list of scan-type names.
pub async fn list_names(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let names: Vec<String> = state
        .store
        .list_scan_types()
        .await?
        .into_iter()
        .map(|t| t.name)
        .collect();

    Ok(Json(json!({
        "success": true,
        "data": names,
    })))
}

/// `GET /scans/scan-types` - full catalog records for administrators.
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
) -> Result<impl IntoResponse> {
    let types = state.store.list_scan_types().await?;
    Ok(Json(json!({
        "success": true,
        "data": types,
    })))
}

/// `POST /scans/scan-types`
pub async fn create(
    State(state): State<AppState>,
    admin: AdminPrincipal,
    JsonBody(payload): JsonBody<ScanTypePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    // Fast path for a friendly message; the storage index is the backstop.
    if state
        .store
        .scan_type_by_name(&payload.name)
        .await?
        .is_some()
    {
        return Err(Error::Conflict(
            "A scan type with this name already exists".to_string(),
        ));
    }

    let scan_type = state
        .store
        .insert_scan_type(NewScanType {
            name: payload.name.trim().to_string(),
            duration: payload.duration,
            created_by: admin.subject(),
        })
        .await?;

    tracing::info!(name = %scan_type.name, duration = scan_type.duration, "Scan type created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Scan type created successfully",
            "data": scan_type,
        })),
    ))
}

/// `PUT /scans/scan-types/{id}`
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<ScanTypePayload>,
) -> Result<impl IntoResponse> {
    if state.store.scan_type_by_id(id).await?.is_none() {
        return Err(Error::NotFound("Scan type not found".to_string()));
    }

    payload.validate()?;

    if let Some(existing) = state.store.scan_type_by_name(&payload.name).await? {
        if existing.id != id {
            return Err(Error::Conflict(
                "A scan type with this name already exists".to_string(),
            ));
        }
    }

    let scan_type = state
        .store
        .update_scan_type(id, payload.name.trim().to_string(), payload.duration)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Scan type updated successfully",
        "data": scan_type,
    })))
}

/// `DELETE /scans/scan-types/{id}` - blocked while any scan block still
/// references the type by name.
pub async fn remove(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let scan_type = state
        .store
        .scan_type_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Scan type not found".to_string()))?;

    let referencing = state
        .store
        .count_blocks_for_scan_type(&scan_type.name)
        .await?;
    if referencing > 0 {
        return Err(Error::Conflict(format!(
            "Cannot delete scan type. It is currently used in {referencing} scan(s). \
             Please remove or reassign those scans first."
        )));
    }

    state.store.delete_scan_type(id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Scan type deleted successfully",
    })))
}
