//! Storage layer - the schedule store trait and its backends

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    models::{
        BlockFilter, Booking, NewBooking, NewScanBlock, NewScanType, ScanBlock, ScanBlockUpdate,
        ScanType,
    },
    Result,
};

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Storage operations for the scan-type catalog, scan blocks, and the
/// booking ledger.
///
/// Any backend (PostgreSQL, in-memory, …) can implement this trait. Two
/// contracts matter beyond plain CRUD:
///
/// - **Uniqueness is enforced here.** `insert_booking` must atomically
///   reject a second confirmed booking for the same `(block, slot)` pair
///   (and for the same `(block, user)` pair) with [`crate::Error::Conflict`],
///   regardless of what the caller pre-checked. The same applies to
///   duplicate `(scan_type, date, start_time)` blocks and to
///   case-insensitive duplicate scan-type names.
/// - **Counts are re-derived.** Reads return `booked_slots` /
///   `available_slots` computed from the confirmed-booking count, and
///   booking writes refresh the stored counter by recounting, never by
///   incrementing.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    // --- scan-type catalog ---

    async fn list_scan_types(&self) -> Result<Vec<ScanType>>;

    async fn scan_type_by_id(&self, id: Uuid) -> Result<Option<ScanType>>;

    /// Case-insensitive name lookup.
    async fn scan_type_by_name(&self, name: &str) -> Result<Option<ScanType>>;

    async fn insert_scan_type(&self, new: NewScanType) -> Result<ScanType>;

    async fn update_scan_type(&self, id: Uuid, name: String, duration: i32) -> Result<ScanType>;

    async fn delete_scan_type(&self, id: Uuid) -> Result<()>;

    /// How many scan blocks reference the type by name.
    async fn count_blocks_for_scan_type(&self, name: &str) -> Result<i64>;

    // --- scan blocks ---

    async fn insert_block(&self, new: NewScanBlock) -> Result<ScanBlock>;

    async fn block_by_id(&self, id: Uuid) -> Result<Option<ScanBlock>>;

    async fn list_blocks(&self, filter: BlockFilter) -> Result<Vec<ScanBlock>>;

    /// Blocks with `date` in the inclusive range, ordered by date then
    /// start time.
    async fn blocks_in_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ScanBlock>>;

    async fn update_block(&self, id: Uuid, update: ScanBlockUpdate) -> Result<ScanBlock>;

    async fn delete_block(&self, id: Uuid) -> Result<()>;

    // --- booking ledger ---

    /// Commit a booking. The write is atomic with respect to the
    /// per-slot and per-user uniqueness constraints, and the owning
    /// block's `booked_slots` is refreshed from the ledger in the same
    /// transaction.
    async fn insert_booking(&self, new: NewBooking) -> Result<Booking>;

    async fn booking_by_id(&self, id: Uuid) -> Result<Option<Booking>>;

    async fn confirmed_booking_for_slot(
        &self,
        block_id: Uuid,
        slot_number: i32,
    ) -> Result<Option<Booking>>;

    async fn confirmed_booking_for_user(
        &self,
        block_id: Uuid,
        user_id: &str,
    ) -> Result<Option<Booking>>;

    /// Confirmed bookings for one block, ordered by slot number.
    async fn confirmed_bookings_for_block(&self, block_id: Uuid) -> Result<Vec<Booking>>;

    /// Confirmed bookings across several blocks (weekly views).
    async fn confirmed_bookings_for_blocks(&self, block_ids: &[Uuid]) -> Result<Vec<Booking>>;

    /// Confirmed bookings with `scan_date` in the inclusive range, ordered
    /// by date then slot start.
    async fn confirmed_bookings_in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Booking>>;

    /// A user's confirmed bookings, most recent first.
    async fn bookings_for_user(&self, user_id: &str) -> Result<Vec<Booking>>;

    /// Transition a confirmed booking to cancelled, freeing its slot
    /// number, and refresh the owning block's count.
    async fn cancel_booking(&self, id: Uuid) -> Result<Booking>;
}
