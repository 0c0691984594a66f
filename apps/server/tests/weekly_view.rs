//! Weekly view tests

mod support;

use axum::http::StatusCode;
use chrono::Duration;
use serde_json::json;
use support::{next_monday, TestApp};

#[tokio::test]
async fn blocks_group_under_their_weekday_names() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    app.seed_scan_type("X-Ray", 15).await?;
    app.seed_scan_type("MRI Scan", 45).await?;

    let monday = next_monday();
    app.seeded_block("X-Ray", monday, "09:00").await?;
    app.seeded_block("MRI Scan", monday + Duration::days(2), "10:00")
        .await?;
    app.seeded_block("X-Ray", monday + Duration::days(6), "14:00")
        .await?;

    // Any date inside the week resolves to the same Monday-start window.
    let thursday = monday + Duration::days(3);
    let (status, body) = app.get(&format!("/scans/week/{thursday}")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["weekStart"], json!(monday.to_string()));
    assert_eq!(
        body["weekEnd"],
        json!((monday + Duration::days(6)).to_string())
    );

    let data = &body["data"];
    assert_eq!(data["Monday"].as_array().unwrap().len(), 1);
    assert_eq!(data["Wednesday"].as_array().unwrap().len(), 1);
    assert_eq!(data["Sunday"].as_array().unwrap().len(), 1);
    for empty in ["Tuesday", "Thursday", "Friday", "Saturday"] {
        assert_eq!(data[empty].as_array().unwrap().len(), 0, "{empty}");
    }

    Ok(())
}

#[tokio::test]
async fn availability_is_rederived_on_every_read() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    app.seed_scan_type("X-Ray", 15).await?;

    let monday = next_monday();
    let block_id = app.seeded_block("X-Ray", monday, "09:00").await?;

    let (_, body) = app.get(&format!("/scans/week/{monday}")).await?;
    let entry = &body["data"]["Monday"][0];
    assert_eq!(entry["availableSlots"], json!(4));
    assert_eq!(entry["bookedSlotNumbers"], json!([]));
    // Slots come re-derived from the block parameters on every read.
    assert_eq!(entry["slots"].as_array().unwrap().len(), 4);
    assert_eq!(entry["slots"][1]["start"], json!("09:15"));
    assert_eq!(entry["slots"][1]["end"], json!("09:30"));

    app.book(&block_id, 2, "Jane Doe", "0771234567").await?;

    let (_, body) = app.get(&format!("/scans/week/{monday}")).await?;
    let entry = &body["data"]["Monday"][0];
    assert_eq!(entry["bookedSlots"], json!(1));
    assert_eq!(entry["availableSlots"], json!(3));
    assert_eq!(entry["bookedSlotNumbers"], json!([2]));
    // Auth is disabled in tests, so the caller counts as an admin and sees
    // the booking details.
    assert_eq!(
        entry["bookingDetails"][0]["patientName"],
        json!("Jane Doe")
    );

    Ok(())
}

#[tokio::test]
async fn weekly_bookings_list_the_weeks_confirmed_bookings() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    app.seed_scan_type("X-Ray", 15).await?;

    let monday = next_monday();
    let in_week = app.seeded_block("X-Ray", monday, "09:00").await?;
    let next_week = app
        .seeded_block("X-Ray", monday + Duration::days(7), "09:00")
        .await?;

    app.book(&in_week, 1, "Jane Doe", "0771234567").await?;
    app.book(&next_week, 1, "John Roe", "0777654321").await?;

    let (status, body) = app.get(&format!("/scans/bookings/week/{monday}")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["data"][0]["patientName"], json!("Jane Doe"));

    Ok(())
}

#[tokio::test]
async fn available_dates_surface_free_slots_per_day() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    app.seed_scan_type("MRI Scan", 45).await?;

    let monday = next_monday();
    let block_id = app.seeded_block("MRI Scan", monday, "09:00").await?;
    app.seeded_block("MRI Scan", monday + Duration::days(1), "09:00")
        .await?;

    // Fill the Monday block entirely.
    for slot in 1..=4 {
        app.book(&block_id, slot, "Jane Doe", &format!("077123456{slot}"))
            .await?;
    }

    let (status, body) = app.get("/scans/available-dates/MRI%20Scan").await?;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["date"], json!((monday + Duration::days(1)).to_string()));
    assert_eq!(data[0]["totalAvailableSlots"], json!(4));

    Ok(())
}
