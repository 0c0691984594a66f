//! Booking handlers

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;

use crate::{
    api::extractors::JsonBody,
    auth::{AdminPrincipal, AuthenticatedPrincipal, OptionalPrincipal},
    models::{BookSlotPayload, Booking},
    services::{booking, schedule},
    state::AppState,
    Error, Result,
};

fn confirmation(booking: &Booking) -> serde_json::Value {
    json!({
        "bookingId": booking.id,
        "scanBlockId": booking.scan_block_id,
        "scanType": booking.scan_type,
        "date": booking.scan_date,
        "slotNumber": booking.slot_number,
        "slotStartTime": booking.slot_start_time,
        "slotEndTime": booking.slot_end_time,
        "patientName": booking.patient_name,
        "patientPhone": booking.patient_phone,
        "notes": booking.notes,
        "bookedAt": booking.booked_at,
        "isAnonymous": booking.is_anonymous,
    })
}

/// `POST /scans/{id}/book` - open to anonymous callers; an authenticated
/// identity, when present, is recorded and limited to one booking per block.
pub async fn book(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<BookSlotPayload>,
) -> Result<impl IntoResponse> {
    let booked =
        booking::submit_booking(state.store.as_ref(), id, payload, principal.as_ref()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment booked successfully",
        "data": confirmation(&booked),
    })))
}

/// `GET /scans/my-bookings`
pub async fn my_bookings(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<impl IntoResponse> {
    let bookings = state.store.bookings_for_user(&principal.subject).await?;

    Ok(Json(json!({
        "success": true,
        "count": bookings.len(),
        "data": bookings,
    })))
}

/// `GET /scans/{id}/bookings` - confirmed bookings for one block.
pub async fn for_block(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    if state.store.block_by_id(id).await?.is_none() {
        return Err(Error::NotFound("Scan block not found".to_string()));
    }

    let bookings = state.store.confirmed_bookings_for_block(id).await?;

    Ok(Json(json!({
        "success": true,
        "count": bookings.len(),
        "data": bookings,
    })))
}

/// `GET /scans/bookings/{id}`
pub async fn details(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let booking = state
        .store
        .booking_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound("Booking not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "data": booking,
    })))
}

/// `GET /scans/bookings/week/{date}`
pub async fn weekly(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(date): Path<NaiveDate>,
) -> Result<impl IntoResponse> {
    let view = schedule::weekly_bookings(state.store.as_ref(), date).await?;
    Ok(Json(view))
}

/// `POST /scans/bookings/{id}/cancel` - frees the slot number for rebooking.
pub async fn cancel(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let cancelled = state.store.cancel_booking(id).await?;

    tracing::info!(
        booking_id = %cancelled.id,
        scan_block_id = %cancelled.scan_block_id,
        slot_number = cancelled.slot_number,
        "Booking cancelled"
    );

    Ok(Json(json!({
        "success": true,
        "message": "Booking cancelled successfully",
        "data": cancelled,
    })))
}
