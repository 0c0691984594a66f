//! Read-side assembly: weekly groupings and per-type availability.

use std::collections::HashMap;

use chrono::{Months, NaiveDate};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use roentgen_scheduling::{week_bounds, weekday_name, WEEKDAY_NAMES};

use crate::{
    db::ScheduleStore,
    models::{BlockFilter, Booking},
    Result,
};

fn booking_detail(booking: &Booking) -> Value {
    json!({
        "id": booking.id,
        "slotNumber": booking.slot_number,
        "slotStartTime": booking.slot_start_time,
        "slotEndTime": booking.slot_end_time,
        "patientName": booking.patient_name,
        "patientPhone": booking.patient_phone,
        "bookedAt": booking.booked_at,
        "notes": booking.notes,
        "isAnonymous": booking.is_anonymous,
        "userId": booking.user_id,
    })
}

/// The week containing `date`, grouped by weekday name Monday..Sunday.
///
/// Every caller sees re-derived booking counts and the taken slot numbers
/// (clients need those to render availability). Full booking details -
/// patient names and phone numbers - are attached only when
/// `include_details` is set, i.e. for administrators.
pub async fn weekly_scans(
    store: &dyn ScheduleStore,
    date: NaiveDate,
    include_details: bool,
) -> Result<Value> {
    let (week_start, week_end) = week_bounds(date);

    let blocks = store.blocks_in_range(week_start, week_end).await?;
    let block_ids: Vec<Uuid> = blocks.iter().map(|b| b.id).collect();
    let bookings = store.confirmed_bookings_for_blocks(&block_ids).await?;

    let mut by_block: HashMap<Uuid, Vec<&Booking>> = HashMap::new();
    for booking in &bookings {
        by_block.entry(booking.scan_block_id).or_default().push(booking);
    }

    let mut days = Map::new();
    for day in WEEKDAY_NAMES {
        days.insert(day.to_string(), Value::Array(Vec::new()));
    }

    for block in &blocks {
        let block_bookings = by_block.remove(&block.id).unwrap_or_default();
        let booked_slot_numbers: Vec<i32> =
            block_bookings.iter().map(|b| b.slot_number).collect();
        // Derived fresh on every read; slots are never stored.
        let slots = block.slots()?;

        let mut entry = serde_json::to_value(block)
            .map_err(|e| crate::Error::Internal(format!("Failed to serialize block: {e}")))?;
        if let Some(obj) = entry.as_object_mut() {
            obj.insert("slots".to_string(), json!(slots));
            obj.insert("bookedSlotNumbers".to_string(), json!(booked_slot_numbers));
            if include_details {
                let details: Vec<Value> =
                    block_bookings.iter().map(|b| booking_detail(b)).collect();
                obj.insert("bookingDetails".to_string(), Value::Array(details));
            }
        }

        if let Some(Value::Array(day)) = days.get_mut(weekday_name(block.date)) {
            day.push(entry);
        }
    }

    Ok(json!({
        "success": true,
        "weekStart": week_start,
        "weekEnd": week_end,
        "data": days,
    }))
}

/// Confirmed bookings across the week containing `date`.
pub async fn weekly_bookings(store: &dyn ScheduleStore, date: NaiveDate) -> Result<Value> {
    let (week_start, week_end) = week_bounds(date);
    let bookings = store
        .confirmed_bookings_in_range(week_start, week_end)
        .await?;

    Ok(json!({
        "success": true,
        "weekStart": week_start,
        "weekEnd": week_end,
        "count": bookings.len(),
        "data": bookings,
    }))
}

/// Upcoming dates (three-month window) on which `scan_type` has at least one
/// free slot, with per-date aggregates.
pub async fn available_dates(
    store: &dyn ScheduleStore,
    scan_type: &str,
    from: NaiveDate,
) -> Result<Value> {
    let to = from
        .checked_add_months(Months::new(3))
        .unwrap_or(NaiveDate::MAX);

    let blocks = store
        .list_blocks(BlockFilter {
            date_range: Some((from, to)),
            scan_type: Some(scan_type.to_string()),
            ..BlockFilter::default()
        })
        .await?;

    // Blocks arrive ordered by date, so insertion order is date order.
    let mut dates: Map<String, Value> = Map::new();
    for block in blocks.iter().filter(|b| b.available_slots > 0) {
        let scan_entry = json!({
            "id": block.id,
            "startTime": block.start_time,
            "endTime": block.end_time,
            "availableSlots": block.available_slots,
            "totalSlots": block.total_slots,
        });

        let entry = dates.entry(block.date.to_string()).or_insert_with(|| {
            json!({
                "date": block.date,
                "displayDate": block.date.format("%A, %B %-d, %Y").to_string(),
                "dayName": weekday_name(block.date),
                "totalAvailableSlots": 0,
                "scans": [],
            })
        });
        if let Some(obj) = entry.as_object_mut() {
            if let Some(total) = obj.get("totalAvailableSlots").and_then(Value::as_i64) {
                obj.insert(
                    "totalAvailableSlots".to_string(),
                    json!(total + i64::from(block.available_slots)),
                );
            }
            if let Some(Value::Array(scans)) = obj.get_mut("scans") {
                scans.push(scan_entry);
            }
        }
    }

    Ok(json!({
        "success": true,
        "scanType": scan_type,
        "fromDate": from,
        "toDate": to,
        "data": dates.into_iter().map(|(_, v)| v).collect::<Vec<_>>(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryStore, ScheduleStore};
    use crate::models::{NewBooking, NewScanBlock};

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    async fn seed_block(store: &InMemoryStore, date: &str, start: &str) -> Uuid {
        store
            .insert_block(NewScanBlock {
                scan_type: "MRI Scan".to_string(),
                date: d(date),
                start_time: start.parse().unwrap(),
                end_time: "17:00".parse().unwrap(),
                duration: 30,
                total_slots: 4,
                notes: None,
                created_by: "admin".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    async fn seed_booking(store: &InMemoryStore, block_id: Uuid, slot: i32) {
        let block = store.block_by_id(block_id).await.unwrap().unwrap();
        store
            .insert_booking(NewBooking {
                scan_block_id: block_id,
                scan_type: block.scan_type,
                scan_date: block.date,
                duration: block.duration,
                slot_number: slot,
                slot_start_time: "09:00".parse().unwrap(),
                slot_end_time: "09:30".parse().unwrap(),
                patient_name: "Jane Doe".to_string(),
                patient_phone: "0771234567".to_string(),
                notes: None,
                user_id: None,
                booker_name: None,
                booker_user_id: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn groups_blocks_by_weekday_name() {
        let store = InMemoryStore::new();
        seed_block(&store, "2025-06-02", "09:00").await; // Monday
        seed_block(&store, "2025-06-04", "09:00").await; // Wednesday
        seed_block(&store, "2025-06-08", "09:00").await; // Sunday

        let view = weekly_scans(&store, d("2025-06-05"), false).await.unwrap();
        assert_eq!(view["weekStart"], json!("2025-06-02"));
        assert_eq!(view["weekEnd"], json!("2025-06-08"));
        assert_eq!(view["data"]["Monday"].as_array().unwrap().len(), 1);
        assert_eq!(view["data"]["Wednesday"].as_array().unwrap().len(), 1);
        assert_eq!(view["data"]["Sunday"].as_array().unwrap().len(), 1);
        assert_eq!(view["data"]["Friday"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn details_are_admin_only_but_slot_numbers_are_not() {
        let store = InMemoryStore::new();
        let block_id = seed_block(&store, "2025-06-02", "09:00").await;
        seed_booking(&store, block_id, 2).await;

        let public = weekly_scans(&store, d("2025-06-02"), false).await.unwrap();
        let entry = &public["data"]["Monday"][0];
        assert_eq!(entry["bookedSlotNumbers"], json!([2]));
        assert_eq!(entry["bookedSlots"], json!(1));
        assert_eq!(entry["availableSlots"], json!(3));
        assert_eq!(entry["slots"].as_array().unwrap().len(), 4);
        assert!(entry.get("bookingDetails").is_none());

        let admin = weekly_scans(&store, d("2025-06-02"), true).await.unwrap();
        let entry = &admin["data"]["Monday"][0];
        assert_eq!(entry["bookingDetails"][0]["patientName"], json!("Jane Doe"));
    }

    #[tokio::test]
    async fn available_dates_skip_full_blocks_and_aggregate_by_date() {
        let store = InMemoryStore::new();
        let first = seed_block(&store, "2025-06-02", "09:00").await;
        seed_block(&store, "2025-06-02", "13:00").await;
        seed_block(&store, "2025-06-03", "09:00").await;

        // Fill the first block completely.
        for slot in 1..=4 {
            seed_booking(&store, first, slot).await;
        }

        let view = available_dates(&store, "MRI Scan", d("2025-06-01"))
            .await
            .unwrap();
        let data = view["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["date"], json!("2025-06-02"));
        assert_eq!(data[0]["totalAvailableSlots"], json!(4));
        assert_eq!(data[0]["scans"].as_array().unwrap().len(), 1);
        assert_eq!(data[1]["date"], json!("2025-06-03"));
        assert_eq!(data[1]["dayName"], json!("Tuesday"));
    }
}
