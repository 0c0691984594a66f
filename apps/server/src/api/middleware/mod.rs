//! HTTP middleware

mod layers;
mod request_id;

pub use layers::{cors, trace};
pub use request_id::request_id_middleware;
