//! Scan-block endpoint tests

mod support;

use axum::http::{Method, StatusCode};
use serde_json::json;
use support::{future_date, TestApp};

#[tokio::test]
async fn create_returns_the_block_with_full_availability() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    app.seed_scan_type("X-Ray", 15).await?;

    let (status, body) = app
        .create_block("X-Ray", future_date(7), "09:00", "10:00", 15, 4)
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["scanType"], json!("X-Ray"));
    assert_eq!(body["data"]["startTime"], json!("09:00"));
    assert_eq!(body["data"]["totalSlots"], json!(4));
    assert_eq!(body["data"]["bookedSlots"], json!(0));
    assert_eq!(body["data"]["availableSlots"], json!(4));

    Ok(())
}

#[tokio::test]
async fn create_rejects_unknown_scan_types() -> anyhow::Result<()> {
    let app = TestApp::new()?;

    let (status, body) = app
        .create_block("Teleportation", future_date(7), "09:00", "10:00", 15, 4)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Invalid scan type"));

    Ok(())
}

#[tokio::test]
async fn create_validates_times_and_dates() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    app.seed_scan_type("X-Ray", 15).await?;

    // Malformed time.
    let (status, body) = app
        .create_block("X-Ray", future_date(7), "9am", "10:00", 15, 4)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("HH:MM"));

    // Start not before end.
    let (status, body) = app
        .create_block("X-Ray", future_date(7), "10:00", "09:00", 15, 4)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Start time must be before end time"));

    // Past date.
    let (status, body) = app
        .create_block("X-Ray", future_date(-1), "09:00", "10:00", 15, 4)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("past dates"));

    Ok(())
}

#[tokio::test]
async fn create_bounds_total_slots() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    app.seed_scan_type("X-Ray", 15).await?;

    for total in [0, 51] {
        let (status, body) = app
            .create_block("X-Ray", future_date(7), "09:00", "10:00", 15, total)
            .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "total {total}");
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("between 1 and 50"));
    }

    Ok(())
}

#[tokio::test]
async fn create_rejects_blocks_spilling_past_midnight() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    app.seed_scan_type("MRI Scan", 60).await?;

    let (status, body) = app
        .create_block("MRI Scan", future_date(7), "23:00", "23:59", 60, 3)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("midnight"));

    Ok(())
}

#[tokio::test]
async fn duplicate_type_date_start_conflicts() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    app.seed_scan_type("X-Ray", 15).await?;
    let date = future_date(7);

    let (status, _) = app
        .create_block("X-Ray", date, "09:00", "10:00", 15, 4)
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .create_block("X-Ray", date, "09:00", "11:00", 15, 8)
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));

    // Same type and date at a different start time is fine.
    let (status, _) = app
        .create_block("X-Ray", date, "11:00", "12:00", 15, 4)
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    Ok(())
}

#[tokio::test]
async fn list_filters_by_availability() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    app.seed_scan_type("X-Ray", 15).await?;
    let date = future_date(7);

    let (_, body) = app.create_block("X-Ray", date, "09:00", "10:00", 15, 1).await?;
    let small = body["data"]["id"].as_str().unwrap().to_string();
    app.create_block("X-Ray", date, "11:00", "12:00", 15, 4).await?;

    // Fill the single-slot block.
    let (status, _) = app.book(&small, 1, "Jane Doe", "0771234567").await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/scans?available=true").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["data"][0]["startTime"], json!("11:00"));

    let (_, body) = app.get("/scans").await?;
    assert_eq!(body["count"], json!(2));

    Ok(())
}

#[tokio::test]
async fn by_date_returns_only_that_day() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    app.seed_scan_type("X-Ray", 15).await?;
    let date = future_date(7);

    app.seeded_block("X-Ray", date, "09:00").await?;
    app.seeded_block("X-Ray", future_date(8), "09:00").await?;

    let (status, body) = app.get(&format!("/scans/date/{date}")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["data"][0]["date"], json!(date.to_string()));

    Ok(())
}

#[tokio::test]
async fn update_revalidates_and_respects_existing_bookings() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    app.seed_scan_type("X-Ray", 15).await?;
    let date = future_date(7);
    let block_id = app.seeded_block("X-Ray", date, "09:00").await?;

    app.book(&block_id, 1, "Jane Doe", "0771234567").await?;
    app.book(&block_id, 2, "John Roe", "0777654321").await?;

    // Shrinking below the confirmed-booking count is refused.
    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/scans/{block_id}"),
            Some(json!({
                "scanType": "X-Ray",
                "date": date,
                "startTime": "09:00",
                "endTime": "17:00",
                "duration": 15,
                "totalSlots": 1,
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("2 existing booking(s)"));

    // Growing the block is fine, and counts stay re-derived.
    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/scans/{block_id}"),
            Some(json!({
                "scanType": "X-Ray",
                "date": date,
                "startTime": "09:00",
                "endTime": "17:00",
                "duration": 15,
                "totalSlots": 10,
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalSlots"], json!(10));
    assert_eq!(body["data"]["bookedSlots"], json!(2));
    assert_eq!(body["data"]["availableSlots"], json!(8));

    Ok(())
}

#[tokio::test]
async fn delete_requires_an_empty_block() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    app.seed_scan_type("X-Ray", 15).await?;
    let block_id = app.seeded_block("X-Ray", future_date(7), "09:00").await?;

    app.book(&block_id, 1, "Jane Doe", "0771234567").await?;

    let (status, body) = app
        .request(Method::DELETE, &format!("/scans/{block_id}"), None)
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("1 booking(s)"));

    // An empty block deletes cleanly.
    let empty_id = app.seeded_block("X-Ray", future_date(8), "09:00").await?;
    let (status, _) = app
        .request(Method::DELETE, &format!("/scans/{empty_id}"), None)
        .await?;
    assert_eq!(status, StatusCode::OK);

    // And unknown blocks are 404s.
    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/scans/{}", uuid::Uuid::new_v4()),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}
