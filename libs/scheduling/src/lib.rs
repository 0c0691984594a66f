#![forbid(unsafe_code)]

//! Pure scheduling domain for the Roentgen booking service.
//!
//! Everything in this crate is synchronous and side-effect free: clock times
//! in the `HH:MM` domain, derivation of bookable slots from a scan block's
//! start time / duration / slot count, and Monday-start week arithmetic.
//! Slots are never persisted; callers re-derive them from block parameters
//! on every request.

mod error;
mod slots;
mod time;
mod week;

pub use error::{Error, Result};
pub use slots::{derive_slots, fits_within_day, slot_window, Slot};
pub use time::{TimeOfDay, MINUTES_PER_DAY};
pub use week::{monday_of, week_bounds, weekday_name, WEEKDAY_NAMES};
