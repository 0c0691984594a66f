//! Shared harness for the integration tests.
//!
//! Builds the real router around the in-memory store with auth disabled
//! (trusted-network mode) and drives it through `tower::ServiceExt`, so the
//! full extraction / validation / response pipeline is exercised without a
//! live database or identity provider.

#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Context as _;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde_json::{json, Value};
use tower::ServiceExt as _;

use roentgen::{
    api::create_router,
    config::{
        AuthConfig, Config, DatabaseConfig, LoggingConfig, ServerConfig, StorageBackend,
    },
    db::{InMemoryStore, ScheduleStore},
    AppState,
};

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec![],
        },
        database: DatabaseConfig {
            backend: StorageBackend::Memory,
            url: String::new(),
            pool_max_size: 1,
            pool_timeout_seconds: 5,
        },
        auth: AuthConfig {
            enabled: false,
            issuer_url: None,
            audience: None,
            jwks_url: None,
            admin_role: "admin".to_string(),
            http_timeout_seconds: 5,
            jwks_cache_ttl_seconds: 60,
        },
        logging: LoggingConfig {
            level: "warn".to_string(),
            json: false,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> anyhow::Result<Self> {
        let store: Arc<dyn ScheduleStore> = Arc::new(InMemoryStore::new());
        let state = AppState::with_store(test_config(), store)?;
        let router = create_router(state.clone());
        Ok(Self { router, state })
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let builder = Request::builder().method(method).uri(path);
        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .context("router error")?;

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).context("response is not JSON")?
        };
        Ok((status, value))
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<(StatusCode, Value)> {
        self.request(Method::GET, path, None).await
    }

    pub async fn seed_scan_type(&self, name: &str, duration: i32) -> anyhow::Result<Value> {
        let (status, body) = self
            .request(
                Method::POST,
                "/scans/scan-types",
                Some(json!({ "name": name, "duration": duration })),
            )
            .await?;
        anyhow::ensure!(
            status == StatusCode::CREATED,
            "scan type seed failed: {status} {body}"
        );
        Ok(body["data"].clone())
    }

    pub async fn create_block(
        &self,
        scan_type: &str,
        date: NaiveDate,
        start: &str,
        end: &str,
        duration: i32,
        total_slots: i32,
    ) -> anyhow::Result<(StatusCode, Value)> {
        self.request(
            Method::POST,
            "/scans",
            Some(json!({
                "scanType": scan_type,
                "date": date,
                "startTime": start,
                "endTime": end,
                "duration": duration,
                "totalSlots": total_slots,
            })),
        )
        .await
    }

    /// Create a block that must succeed, returning its id.
    pub async fn seeded_block(
        &self,
        scan_type: &str,
        date: NaiveDate,
        start: &str,
    ) -> anyhow::Result<String> {
        let (status, body) = self
            .create_block(scan_type, date, start, "17:00", 15, 4)
            .await?;
        anyhow::ensure!(
            status == StatusCode::CREATED,
            "block seed failed: {status} {body}"
        );
        Ok(body["data"]["id"]
            .as_str()
            .context("created block has no id")?
            .to_string())
    }

    pub async fn book(
        &self,
        block_id: &str,
        slot_number: i32,
        patient_name: &str,
        patient_phone: &str,
    ) -> anyhow::Result<(StatusCode, Value)> {
        self.request(
            Method::POST,
            &format!("/scans/{block_id}/book"),
            Some(json!({
                "patientName": patient_name,
                "patientPhone": patient_phone,
                "slotNumber": slot_number,
            })),
        )
        .await
    }
}

/// The Monday of next week; always strictly in the future.
pub fn next_monday() -> NaiveDate {
    let today = Utc::now().date_naive();
    let offset = 7 - i64::from(today.weekday().num_days_from_monday());
    today + Duration::days(offset)
}

pub fn future_date(days: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(days)
}
