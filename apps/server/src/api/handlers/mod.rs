//! Request handlers for API endpoints
//!
//! Handlers keep to HTTP concerns - extraction, access control, response
//! shaping - and delegate domain decisions to the services and the store.

pub mod bookings;
pub mod scan_blocks;
pub mod scan_types;
