//! Process-local store for development and tests.
//!
//! Mirrors the PostgreSQL backend's contracts: uniqueness is enforced inside
//! a single write lock over the ledger, so concurrent booking attempts for
//! the same slot resolve to exactly one success no matter how the callers
//! interleaved their pre-checks.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    models::{
        BlockFilter, Booking, BookingStatus, NewBooking, NewScanBlock, NewScanType, ScanBlock,
        ScanBlockUpdate, ScanType,
    },
    Error, Result,
};

use super::ScheduleStore;

#[derive(Default)]
struct Inner {
    scan_types: Vec<ScanType>,
    blocks: Vec<ScanBlock>,
    bookings: Vec<Booking>,
}

impl Inner {
    fn confirmed_count(&self, block_id: Uuid) -> i32 {
        self.bookings
            .iter()
            .filter(|b| b.scan_block_id == block_id && b.status == BookingStatus::Confirmed)
            .count() as i32
    }

    /// Clone with counts re-derived from the ledger.
    fn block_view(&self, block: &ScanBlock) -> ScanBlock {
        let booked = self.confirmed_count(block.id);
        let mut view = block.clone();
        view.booked_slots = booked;
        view.available_slots = block.total_slots - booked;
        view
    }

    fn refresh_block_count(&mut self, block_id: Uuid) {
        let booked = self.confirmed_count(block_id);
        if let Some(block) = self.blocks.iter_mut().find(|b| b.id == block_id) {
            block.booked_slots = booked;
            block.available_slots = block.total_slots - booked;
        }
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryStore {
    async fn list_scan_types(&self) -> Result<Vec<ScanType>> {
        let inner = self.inner.read().await;
        let mut types = inner.scan_types.clone();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }

    async fn scan_type_by_id(&self, id: Uuid) -> Result<Option<ScanType>> {
        let inner = self.inner.read().await;
        Ok(inner.scan_types.iter().find(|t| t.id == id).cloned())
    }

    async fn scan_type_by_name(&self, name: &str) -> Result<Option<ScanType>> {
        let inner = self.inner.read().await;
        Ok(inner
            .scan_types
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn insert_scan_type(&self, new: NewScanType) -> Result<ScanType> {
        let mut inner = self.inner.write().await;
        if inner
            .scan_types
            .iter()
            .any(|t| t.name.eq_ignore_ascii_case(&new.name))
        {
            return Err(Error::Conflict(
                "A scan type with this name already exists".to_string(),
            ));
        }
        let now = Utc::now();
        let scan_type = ScanType {
            id: Uuid::new_v4(),
            name: new.name,
            duration: new.duration,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        };
        inner.scan_types.push(scan_type.clone());
        Ok(scan_type)
    }

    async fn update_scan_type(&self, id: Uuid, name: String, duration: i32) -> Result<ScanType> {
        let mut inner = self.inner.write().await;
        if inner
            .scan_types
            .iter()
            .any(|t| t.id != id && t.name.eq_ignore_ascii_case(&name))
        {
            return Err(Error::Conflict(
                "A scan type with this name already exists".to_string(),
            ));
        }
        let scan_type = inner
            .scan_types
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotFound("Scan type not found".to_string()))?;
        scan_type.name = name;
        scan_type.duration = duration;
        scan_type.updated_at = Utc::now();
        Ok(scan_type.clone())
    }

    async fn delete_scan_type(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.scan_types.retain(|t| t.id != id);
        Ok(())
    }

    async fn count_blocks_for_scan_type(&self, name: &str) -> Result<i64> {
        let inner = self.inner.read().await;
        Ok(inner.blocks.iter().filter(|b| b.scan_type == name).count() as i64)
    }

    async fn insert_block(&self, new: NewScanBlock) -> Result<ScanBlock> {
        let mut inner = self.inner.write().await;
        if inner.blocks.iter().any(|b| {
            b.scan_type == new.scan_type && b.date == new.date && b.start_time == new.start_time
        }) {
            return Err(Error::Conflict(
                "A slot for this scan type already exists at this time".to_string(),
            ));
        }
        let block = ScanBlock {
            id: Uuid::new_v4(),
            scan_type: new.scan_type,
            date: new.date,
            start_time: new.start_time,
            end_time: new.end_time,
            duration: new.duration,
            total_slots: new.total_slots,
            booked_slots: 0,
            available_slots: new.total_slots,
            notes: new.notes,
            created_by: new.created_by,
            created_at: Utc::now(),
        };
        inner.blocks.push(block.clone());
        Ok(block)
    }

    async fn block_by_id(&self, id: Uuid) -> Result<Option<ScanBlock>> {
        let inner = self.inner.read().await;
        Ok(inner
            .blocks
            .iter()
            .find(|b| b.id == id)
            .map(|b| inner.block_view(b)))
    }

    async fn list_blocks(&self, filter: BlockFilter) -> Result<Vec<ScanBlock>> {
        let inner = self.inner.read().await;
        let mut blocks: Vec<ScanBlock> = inner
            .blocks
            .iter()
            .filter(|b| filter.date.map_or(true, |d| b.date == d))
            .filter(|b| {
                filter
                    .date_range
                    .map_or(true, |(from, to)| b.date >= from && b.date <= to)
            })
            .filter(|b| {
                filter
                    .scan_type
                    .as_deref()
                    .map_or(true, |t| b.scan_type == t)
            })
            .map(|b| inner.block_view(b))
            .filter(|b| !filter.only_available || b.available_slots > 0)
            .collect();
        blocks.sort_by(|a, b| (a.date, a.start_time).cmp(&(b.date, b.start_time)));
        Ok(blocks)
    }

    async fn blocks_in_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ScanBlock>> {
        self.list_blocks(BlockFilter {
            date_range: Some((from, to)),
            ..BlockFilter::default()
        })
        .await
    }

    async fn update_block(&self, id: Uuid, update: ScanBlockUpdate) -> Result<ScanBlock> {
        let mut inner = self.inner.write().await;
        if inner.blocks.iter().any(|b| {
            b.id != id
                && b.scan_type == update.scan_type
                && b.date == update.date
                && b.start_time == update.start_time
        }) {
            return Err(Error::Conflict(
                "A slot for this scan type already exists at this time".to_string(),
            ));
        }
        let idx = inner
            .blocks
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| Error::NotFound("Scan block not found".to_string()))?;
        {
            let block = &mut inner.blocks[idx];
            block.scan_type = update.scan_type;
            block.date = update.date;
            block.start_time = update.start_time;
            block.end_time = update.end_time;
            block.duration = update.duration;
            block.total_slots = update.total_slots;
            block.notes = update.notes;
        }
        inner.refresh_block_count(id);
        Ok(inner.blocks[idx].clone())
    }

    async fn delete_block(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.blocks.retain(|b| b.id != id);
        Ok(())
    }

    async fn insert_booking(&self, new: NewBooking) -> Result<Booking> {
        // Single write lock: the uniqueness checks and the insert are one
        // atomic step, which is what makes concurrent double-booking
        // impossible on this backend.
        let mut inner = self.inner.write().await;

        if inner.bookings.iter().any(|b| {
            b.scan_block_id == new.scan_block_id
                && b.slot_number == new.slot_number
                && b.status == BookingStatus::Confirmed
        }) {
            return Err(Error::Conflict(
                "This time slot is already booked".to_string(),
            ));
        }

        if let Some(user_id) = &new.user_id {
            if inner.bookings.iter().any(|b| {
                b.scan_block_id == new.scan_block_id
                    && b.user_id.as_deref() == Some(user_id)
                    && b.status == BookingStatus::Confirmed
            }) {
                return Err(Error::Conflict(
                    "You already have a booking for this scan block".to_string(),
                ));
            }
        }

        let is_anonymous = new.user_id.is_none();
        let booking = Booking {
            id: Uuid::new_v4(),
            scan_block_id: new.scan_block_id,
            scan_type: new.scan_type,
            scan_date: new.scan_date,
            duration: new.duration,
            slot_number: new.slot_number,
            slot_start_time: new.slot_start_time,
            slot_end_time: new.slot_end_time,
            patient_name: new.patient_name,
            patient_phone: new.patient_phone,
            notes: new.notes,
            user_id: new.user_id,
            booker_name: new.booker_name,
            booker_user_id: new.booker_user_id,
            is_anonymous,
            status: BookingStatus::Confirmed,
            booked_at: Utc::now(),
        };
        inner.bookings.push(booking.clone());
        inner.refresh_block_count(booking.scan_block_id);
        Ok(booking)
    }

    async fn booking_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        let inner = self.inner.read().await;
        Ok(inner.bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn confirmed_booking_for_slot(
        &self,
        block_id: Uuid,
        slot_number: i32,
    ) -> Result<Option<Booking>> {
        let inner = self.inner.read().await;
        Ok(inner
            .bookings
            .iter()
            .find(|b| {
                b.scan_block_id == block_id
                    && b.slot_number == slot_number
                    && b.status == BookingStatus::Confirmed
            })
            .cloned())
    }

    async fn confirmed_booking_for_user(
        &self,
        block_id: Uuid,
        user_id: &str,
    ) -> Result<Option<Booking>> {
        let inner = self.inner.read().await;
        Ok(inner
            .bookings
            .iter()
            .find(|b| {
                b.scan_block_id == block_id
                    && b.user_id.as_deref() == Some(user_id)
                    && b.status == BookingStatus::Confirmed
            })
            .cloned())
    }

    async fn confirmed_bookings_for_block(&self, block_id: Uuid) -> Result<Vec<Booking>> {
        let inner = self.inner.read().await;
        let mut bookings: Vec<Booking> = inner
            .bookings
            .iter()
            .filter(|b| b.scan_block_id == block_id && b.status == BookingStatus::Confirmed)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.slot_number);
        Ok(bookings)
    }

    async fn confirmed_bookings_for_blocks(&self, block_ids: &[Uuid]) -> Result<Vec<Booking>> {
        let inner = self.inner.read().await;
        let mut bookings: Vec<Booking> = inner
            .bookings
            .iter()
            .filter(|b| {
                block_ids.contains(&b.scan_block_id) && b.status == BookingStatus::Confirmed
            })
            .cloned()
            .collect();
        bookings.sort_by_key(|b| (b.scan_block_id, b.slot_number));
        Ok(bookings)
    }

    async fn confirmed_bookings_in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Booking>> {
        let inner = self.inner.read().await;
        let mut bookings: Vec<Booking> = inner
            .bookings
            .iter()
            .filter(|b| {
                b.scan_date >= from && b.scan_date <= to && b.status == BookingStatus::Confirmed
            })
            .cloned()
            .collect();
        bookings.sort_by_key(|b| (b.scan_date, b.slot_start_time, b.slot_number));
        Ok(bookings)
    }

    async fn bookings_for_user(&self, user_id: &str) -> Result<Vec<Booking>> {
        let inner = self.inner.read().await;
        let mut bookings: Vec<Booking> = inner
            .bookings
            .iter()
            .filter(|b| b.user_id.as_deref() == Some(user_id) && b.status == BookingStatus::Confirmed)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.booked_at.cmp(&a.booked_at));
        Ok(bookings)
    }

    async fn cancel_booking(&self, id: Uuid) -> Result<Booking> {
        let mut inner = self.inner.write().await;
        let booking = inner
            .bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| Error::NotFound("Booking not found".to_string()))?;
        if booking.status != BookingStatus::Confirmed {
            return Err(Error::Conflict(
                "Only confirmed bookings can be cancelled".to_string(),
            ));
        }
        booking.status = BookingStatus::Cancelled;
        let cancelled = booking.clone();
        inner.refresh_block_count(cancelled.scan_block_id);
        Ok(cancelled)
    }
}
