//! Domain models and request payloads for the booking service

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use roentgen_scheduling::{derive_slots, Slot, TimeOfDay};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Permissive phone pattern: at least ten characters of digits and common
/// separators, checked after stripping whitespace.
pub static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d\s\-\+\(\)]{10,}$").expect("phone pattern compiles"));

pub fn valid_phone(raw: &str) -> bool {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    PHONE_PATTERN.is_match(&compact)
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// A named category of medical scan with a standard duration, used as the
/// catalog for scan-block creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanType {
    pub id: Uuid,
    pub name: String,
    /// Minutes, 5..=300.
    pub duration: i32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewScanType {
    pub name: String,
    pub duration: i32,
    pub created_by: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScanTypePayload {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(range(min = 5, max = 300, message = "Duration must be between 5 and 300 minutes"))]
    pub duration: i32,
}

// ---------------------------------------------------------------------------
// Scan blocks
// ---------------------------------------------------------------------------

/// An admin-defined schedule entry: one scan type on one date, starting at a
/// fixed time, carved into `total_slots` equal-duration slots.
///
/// `booked_slots` and `available_slots` are re-derived from the confirmed
/// booking count on every read; the stored counter is refreshed on each
/// commit but never trusted on its own.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanBlock {
    pub id: Uuid,
    pub scan_type: String,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    /// Advisory end of the block; slot windows are derived from
    /// `start_time` and `duration`.
    pub end_time: TimeOfDay,
    /// Per-slot duration in minutes.
    pub duration: i32,
    pub total_slots: i32,
    pub booked_slots: i32,
    pub available_slots: i32,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl ScanBlock {
    /// The ordered slot sequence for this block, recomputed on demand.
    pub fn slots(&self) -> crate::Result<Vec<Slot>> {
        derive_slots(
            self.start_time,
            self.duration.max(0) as u32,
            self.total_slots.max(0) as u32,
        )
        .map_err(|e| crate::Error::Internal(format!("stored block derives no slots: {e}")))
    }
}

#[derive(Debug, Clone)]
pub struct NewScanBlock {
    pub scan_type: String,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub duration: i32,
    pub total_slots: i32,
    pub notes: Option<String>,
    pub created_by: String,
}

/// Replacement values for `PUT /scans/{id}`.
#[derive(Debug, Clone)]
pub struct ScanBlockUpdate {
    pub scan_type: String,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub duration: i32,
    pub total_slots: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScanBlockPayload {
    #[validate(length(min = 1, message = "Please provide a scan type"))]
    pub scan_type: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    #[validate(range(min = 1, message = "Duration must be a positive number of minutes"))]
    pub duration: i32,
    #[validate(range(min = 1, max = 50, message = "Total slots must be between 1 and 50"))]
    pub total_slots: i32,
    #[validate(length(max = 500, message = "Notes cannot be more than 500 characters"))]
    pub notes: Option<String>,
}

/// Query filters for the admin scan-block listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanListQuery {
    pub date: Option<NaiveDate>,
    /// Any date inside the wanted week.
    pub week: Option<NaiveDate>,
    pub scan_type: Option<String>,
    /// `true` restricts to blocks with at least one free slot.
    pub available: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct BlockFilter {
    pub date: Option<NaiveDate>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub scan_type: Option<String>,
    pub only_available: bool,
}

// ---------------------------------------------------------------------------
// Bookings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }
}

/// A confirmed (or later cancelled/completed) reservation of one slot.
///
/// Scan type, date and duration are denormalized from the block at booking
/// time so history stays stable if the block is later edited.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub scan_block_id: Uuid,
    pub scan_type: String,
    pub scan_date: NaiveDate,
    pub duration: i32,
    pub slot_number: i32,
    pub slot_start_time: TimeOfDay,
    pub slot_end_time: TimeOfDay,
    pub patient_name: String,
    pub patient_phone: String,
    pub notes: Option<String>,
    /// Authenticated subject, `None` for anonymous bookings.
    pub user_id: Option<String>,
    pub booker_name: Option<String>,
    pub booker_user_id: Option<String>,
    pub is_anonymous: bool,
    pub status: BookingStatus,
    pub booked_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub scan_block_id: Uuid,
    pub scan_type: String,
    pub scan_date: NaiveDate,
    pub duration: i32,
    pub slot_number: i32,
    pub slot_start_time: TimeOfDay,
    pub slot_end_time: TimeOfDay,
    pub patient_name: String,
    pub patient_phone: String,
    pub notes: Option<String>,
    pub user_id: Option<String>,
    pub booker_name: Option<String>,
    pub booker_user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookSlotPayload {
    #[validate(length(min = 1, max = 100, message = "Patient name is required"))]
    pub patient_name: String,
    pub patient_phone: String,
    pub slot_number: i32,
    #[validate(length(max = 500, message = "Notes cannot be more than 500 characters"))]
    pub notes: Option<String>,
    /// Accepted for wire compatibility; the server re-derives the window
    /// from the slot number and never trusts these.
    pub slot_start_time: Option<String>,
    pub slot_end_time: Option<String>,
    #[validate(length(max = 100, message = "Booker name cannot be more than 100 characters"))]
    pub booker_name: Option<String>,
    pub booker_user_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_pattern_accepts_common_formats() {
        for phone in ["0771234567", "+94 77 123 4567", "(077) 123-4567"] {
            assert!(valid_phone(phone), "{phone} should be accepted");
        }
    }

    #[test]
    fn phone_pattern_rejects_short_or_alphabetic_input() {
        for phone in ["12345", "not-a-phone", "", "07712e4567"] {
            assert!(!valid_phone(phone), "{phone} should be rejected");
        }
    }

    #[test]
    fn booking_status_round_trips() {
        for status in [
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::Completed,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("pending"), None);
    }
}
