//! Scan-block handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use roentgen_scheduling::{fits_within_day, week_bounds, TimeOfDay};

use crate::{
    api::extractors::JsonBody,
    auth::{AdminPrincipal, OptionalPrincipal},
    models::{BlockFilter, NewScanBlock, ScanBlockPayload, ScanBlockUpdate, ScanListQuery},
    services::schedule,
    state::AppState,
    Error, Result,
};

fn parse_time(raw: &str) -> Result<TimeOfDay> {
    raw.parse()
        .map_err(|_| Error::Validation("Invalid time format. Use HH:MM format".to_string()))
}

/// Shape checks shared by create and update, returning the parsed times.
async fn validate_payload(
    state: &AppState,
    payload: &ScanBlockPayload,
) -> Result<(TimeOfDay, TimeOfDay)> {
    payload.validate()?;

    let start_time = parse_time(&payload.start_time)?;
    let end_time = parse_time(&payload.end_time)?;

    if state
        .store
        .scan_type_by_name(&payload.scan_type)
        .await?
        .is_none()
    {
        return Err(Error::Validation(
            "Invalid scan type. Please select a valid scan type from the system.".to_string(),
        ));
    }

    if start_time >= end_time {
        return Err(Error::Validation(
            "Start time must be before end time".to_string(),
        ));
    }

    if !fits_within_day(
        start_time,
        payload.duration as u32,
        payload.total_slots as u32,
    ) {
        return Err(Error::Validation(
            "Scan slots must end before midnight".to_string(),
        ));
    }

    Ok((start_time, end_time))
}

/// `POST /scans`
pub async fn create(
    State(state): State<AppState>,
    admin: AdminPrincipal,
    JsonBody(payload): JsonBody<ScanBlockPayload>,
) -> Result<impl IntoResponse> {
    let (start_time, end_time) = validate_payload(&state, &payload).await?;

    if payload.date < Utc::now().date_naive() {
        return Err(Error::Validation(
            "Cannot schedule scans for past dates".to_string(),
        ));
    }

    // Fast path; the unique index on (scan_type, date, start_time) is the
    // race-safe backstop inside insert_block.
    let block = state
        .store
        .insert_block(NewScanBlock {
            scan_type: payload.scan_type.trim().to_string(),
            date: payload.date,
            start_time,
            end_time,
            duration: payload.duration,
            total_slots: payload.total_slots,
            notes: payload.notes.clone(),
            created_by: admin.subject(),
        })
        .await?;

    tracing::info!(
        block_id = %block.id,
        scan_type = %block.scan_type,
        date = %block.date,
        total_slots = block.total_slots,
        "Scan block created"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": block,
        })),
    ))
}

/// `GET /scans` - admin listing with optional filters.
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Query(query): Query<ScanListQuery>,
) -> Result<impl IntoResponse> {
    let filter = BlockFilter {
        date: query.date,
        date_range: query.week.map(week_bounds),
        scan_type: query.scan_type,
        only_available: query.available.unwrap_or(false),
    };

    let blocks = state.store.list_blocks(filter).await?;

    Ok(Json(json!({
        "success": true,
        "count": blocks.len(),
        "data": blocks,
    })))
}

/// `GET /scans/date/{date}`
pub async fn by_date(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(date): Path<NaiveDate>,
) -> Result<impl IntoResponse> {
    let blocks = state
        .store
        .list_blocks(BlockFilter {
            date: Some(date),
            ..BlockFilter::default()
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": blocks.len(),
        "data": blocks,
    })))
}

/// `GET /scans/week/{date}` - public weekly view; booking details are
/// attached only for administrators.
pub async fn weekly(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    Path(date): Path<NaiveDate>,
) -> Result<impl IntoResponse> {
    let include_details = state.auth.is_admin(principal.as_ref());
    let view = schedule::weekly_scans(state.store.as_ref(), date, include_details).await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableDatesQuery {
    pub from_date: Option<NaiveDate>,
}

/// `GET /scans/available-dates/{scanType}`
pub async fn available_dates(
    State(state): State<AppState>,
    Path(scan_type): Path<String>,
    Query(query): Query<AvailableDatesQuery>,
) -> Result<impl IntoResponse> {
    let from = query.from_date.unwrap_or_else(|| Utc::now().date_naive());
    let view = schedule::available_dates(state.store.as_ref(), &scan_type, from).await?;
    Ok(Json(view))
}

/// `PUT /scans/{id}`
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<ScanBlockPayload>,
) -> Result<impl IntoResponse> {
    let existing = state
        .store
        .block_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Scan block not found".to_string()))?;

    let (start_time, end_time) = validate_payload(&state, &payload).await?;

    // `booked_slots` is re-derived on read, so this is the live count.
    if payload.total_slots < existing.booked_slots {
        return Err(Error::Conflict(format!(
            "Total slots cannot be less than the {} existing booking(s)",
            existing.booked_slots
        )));
    }

    let block = state
        .store
        .update_block(
            id,
            ScanBlockUpdate {
                scan_type: payload.scan_type.trim().to_string(),
                date: payload.date,
                start_time,
                end_time,
                duration: payload.duration,
                total_slots: payload.total_slots,
                notes: payload.notes.clone(),
            },
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": block,
    })))
}

/// `DELETE /scans/{id}` - booking history is never silently destroyed.
pub async fn remove(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let block = state
        .store
        .block_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Scan slot not found".to_string()))?;

    if block.booked_slots > 0 {
        return Err(Error::Conflict(format!(
            "Cannot delete slot with {} booking(s). Cancel all bookings first.",
            block.booked_slots
        )));
    }

    state.store.delete_block(id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Scan slot deleted successfully",
    })))
}
