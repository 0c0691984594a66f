//! The booking write path.
//!
//! This is the sole code path that creates bookings. Validation runs in a
//! fixed order, each check a distinct failure; the existence pre-checks
//! against the ledger are a fast path for good error messages, while the
//! store's uniqueness constraints remain the actual guard against races.

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use roentgen_scheduling::slot_window;

use crate::{
    auth::Principal,
    db::ScheduleStore,
    models::{valid_phone, BookSlotPayload, Booking, NewBooking},
    Error, Result,
};

fn normalized(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Validate and commit a booking for one slot of `scan_block_id`.
pub async fn submit_booking(
    store: &dyn ScheduleStore,
    scan_block_id: Uuid,
    payload: BookSlotPayload,
    principal: Option<&Principal>,
) -> Result<Booking> {
    let block = store
        .block_by_id(scan_block_id)
        .await?
        .ok_or_else(|| Error::NotFound("Scan block not found".to_string()))?;

    // Server clock, not anything client-supplied.
    let today = Utc::now().date_naive();
    if block.date < today {
        return Err(Error::Validation(
            "Cannot book appointments for past dates".to_string(),
        ));
    }

    payload.validate()?;
    if !valid_phone(&payload.patient_phone) {
        return Err(Error::Validation(
            "Please provide a valid phone number".to_string(),
        ));
    }

    if payload.slot_number < 1 || payload.slot_number > block.total_slots {
        return Err(Error::Validation(format!(
            "Slot number must be between 1 and {}",
            block.total_slots
        )));
    }

    // The slot window comes from the deriver; client-sent times are ignored.
    let (slot_start, slot_end) = slot_window(
        block.start_time,
        block.duration as u32,
        payload.slot_number as u32,
        block.total_slots as u32,
    )
    .map_err(|e| Error::Internal(format!("Slot derivation failed: {e}")))?;

    if store
        .confirmed_booking_for_slot(block.id, payload.slot_number)
        .await?
        .is_some()
    {
        return Err(Error::Conflict(
            "This time slot is already booked".to_string(),
        ));
    }

    let user_id = principal.map(|p| p.subject.clone());
    if let Some(user) = &user_id {
        if store
            .confirmed_booking_for_user(block.id, user)
            .await?
            .is_some()
        {
            return Err(Error::Conflict(
                "You already have a booking for this scan block".to_string(),
            ));
        }
    }

    let booker_name = normalized(payload.booker_name)
        .or_else(|| principal.and_then(|p| p.name.clone()));
    let booker_user_id = normalized(payload.booker_user_id).or_else(|| user_id.clone());

    let booking = store
        .insert_booking(NewBooking {
            scan_block_id: block.id,
            scan_type: block.scan_type.clone(),
            scan_date: block.date,
            duration: block.duration,
            slot_number: payload.slot_number,
            slot_start_time: slot_start,
            slot_end_time: slot_end,
            patient_name: payload.patient_name.trim().to_string(),
            patient_phone: payload.patient_phone.trim().to_string(),
            notes: normalized(payload.notes),
            user_id,
            booker_name,
            booker_user_id,
        })
        .await?;

    tracing::info!(
        booking_id = %booking.id,
        scan_block_id = %booking.scan_block_id,
        slot_number = booking.slot_number,
        anonymous = booking.is_anonymous,
        "Booking committed"
    );

    Ok(booking)
}
