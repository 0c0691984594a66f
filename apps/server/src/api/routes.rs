//! Booking API routes
//!
//! Static segments are registered before parameterized ones so that
//! `/scans/types` and friends never collide with `/scans/{id}`.

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::api::handlers::{bookings, scan_blocks, scan_types};
use crate::state::AppState;

pub fn scan_routes() -> Router<AppState> {
    Router::new()
        // Scan-type catalog
        .route("/types", get(scan_types::list_names))
        .route(
            "/scan-types",
            get(scan_types::list).post(scan_types::create),
        )
        .route(
            "/scan-types/:id",
            put(scan_types::update).delete(scan_types::remove),
        )
        // Weekly and date views
        .route("/week/:date", get(scan_blocks::weekly))
        .route("/date/:date", get(scan_blocks::by_date))
        .route(
            "/available-dates/:scan_type",
            get(scan_blocks::available_dates),
        )
        // Booking reads
        .route("/my-bookings", get(bookings::my_bookings))
        .route("/bookings/week/:date", get(bookings::weekly))
        .route("/bookings/:id", get(bookings::details))
        .route("/bookings/:id/cancel", post(bookings::cancel))
        // Scan blocks
        .route("/", post(scan_blocks::create).get(scan_blocks::list))
        .route("/:id", put(scan_blocks::update).delete(scan_blocks::remove))
        .route("/:id/book", post(bookings::book))
        .route("/:id/bookings", get(bookings::for_block))
}
