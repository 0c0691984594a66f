//! PostgreSQL schedule store.
//!
//! The uniqueness guarantees live in the schema (`0001_schema.sql`): partial
//! unique indexes over confirmed bookings, plus unique indexes on block
//! identity and case-folded scan-type names. Application-level pre-checks
//! are a fast path only; a race that slips past them lands here as a
//! constraint violation and is remapped to [`Error::Conflict`].

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use roentgen_scheduling::TimeOfDay;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgPool, QueryBuilder, Row,
};
use std::time::Duration;
use uuid::Uuid;

use crate::{
    config::DatabaseConfig,
    models::{
        BlockFilter, Booking, BookingStatus, NewBooking, NewScanBlock, NewScanType, ScanBlock,
        ScanBlockUpdate, ScanType,
    },
    Error, Result,
};

use super::ScheduleStore;

const CONFIRMED_COUNT: &str = "(SELECT COUNT(*) FROM bookings b \
     WHERE b.scan_block_id = s.id AND b.status = 'confirmed')";

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_max_size)
            .acquire_timeout(Duration::from_secs(config.pool_timeout_seconds))
            .connect(&config.url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| Error::Internal(format!("Migration failed: {e}")))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Constraint name of a Postgres unique violation, if the error is one.
fn unique_violation(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            db.constraint().map(|c| c.to_string())
        }
        _ => None,
    }
}

fn map_scan_type_insert_error(err: sqlx::Error) -> Error {
    match unique_violation(&err).as_deref() {
        Some("scan_types_name_ci_idx") => {
            Error::Conflict("A scan type with this name already exists".to_string())
        }
        _ => Error::Database(err),
    }
}

fn map_block_insert_error(err: sqlx::Error) -> Error {
    match unique_violation(&err).as_deref() {
        Some("scan_blocks_type_date_start_idx") => {
            Error::Conflict("A slot for this scan type already exists at this time".to_string())
        }
        _ => Error::Database(err),
    }
}

fn map_booking_insert_error(err: sqlx::Error) -> Error {
    match unique_violation(&err).as_deref() {
        Some("bookings_confirmed_slot_idx") => {
            Error::Conflict("This time slot is already booked".to_string())
        }
        Some("bookings_confirmed_user_idx") => {
            Error::Conflict("You already have a booking for this scan block".to_string())
        }
        _ => Error::Database(err),
    }
}

fn scan_type_from_row(row: &PgRow) -> Result<ScanType> {
    Ok(ScanType {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        duration: row.try_get("duration_minutes")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn block_from_row(row: &PgRow) -> Result<ScanBlock> {
    let total_slots: i32 = row.try_get("total_slots")?;
    let booked: i64 = row.try_get("confirmed_count")?;
    let booked = booked as i32;
    Ok(ScanBlock {
        id: row.try_get("id")?,
        scan_type: row.try_get("scan_type")?,
        date: row.try_get("date")?,
        start_time: TimeOfDay::from_naive_time(row.try_get::<NaiveTime, _>("start_time")?),
        end_time: TimeOfDay::from_naive_time(row.try_get::<NaiveTime, _>("end_time")?),
        duration: row.try_get("duration_minutes")?,
        total_slots,
        booked_slots: booked,
        available_slots: total_slots - booked,
        notes: row.try_get("notes")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
    })
}

fn booking_from_row(row: &PgRow) -> Result<Booking> {
    let status: String = row.try_get("status")?;
    let status = BookingStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Unknown booking status '{status}'")))?;
    Ok(Booking {
        id: row.try_get("id")?,
        scan_block_id: row.try_get("scan_block_id")?,
        scan_type: row.try_get("scan_type")?,
        scan_date: row.try_get("scan_date")?,
        duration: row.try_get("duration_minutes")?,
        slot_number: row.try_get("slot_number")?,
        slot_start_time: TimeOfDay::from_naive_time(
            row.try_get::<NaiveTime, _>("slot_start_time")?,
        ),
        slot_end_time: TimeOfDay::from_naive_time(row.try_get::<NaiveTime, _>("slot_end_time")?),
        patient_name: row.try_get("patient_name")?,
        patient_phone: row.try_get("patient_phone")?,
        notes: row.try_get("notes")?,
        user_id: row.try_get("user_id")?,
        booker_name: row.try_get("booker_name")?,
        booker_user_id: row.try_get("booker_user_id")?,
        is_anonymous: row.try_get("is_anonymous")?,
        status,
        booked_at: row.try_get("booked_at")?,
    })
}

#[async_trait]
impl ScheduleStore for PostgresStore {
    async fn list_scan_types(&self) -> Result<Vec<ScanType>> {
        let rows = sqlx::query("SELECT * FROM scan_types ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(scan_type_from_row).collect()
    }

    async fn scan_type_by_id(&self, id: Uuid) -> Result<Option<ScanType>> {
        let row = sqlx::query("SELECT * FROM scan_types WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(scan_type_from_row).transpose()
    }

    async fn scan_type_by_name(&self, name: &str) -> Result<Option<ScanType>> {
        let row = sqlx::query("SELECT * FROM scan_types WHERE lower(name) = lower($1)")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(scan_type_from_row).transpose()
    }

    async fn insert_scan_type(&self, new: NewScanType) -> Result<ScanType> {
        let row = sqlx::query(
            "INSERT INTO scan_types (id, name, duration_minutes, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(new.duration)
        .bind(&new.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(map_scan_type_insert_error)?;
        scan_type_from_row(&row)
    }

    async fn update_scan_type(&self, id: Uuid, name: String, duration: i32) -> Result<ScanType> {
        let row = sqlx::query(
            "UPDATE scan_types
             SET name = $2, duration_minutes = $3, updated_at = now()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(&name)
        .bind(duration)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_scan_type_insert_error)?;
        match row {
            Some(row) => scan_type_from_row(&row),
            None => Err(Error::NotFound("Scan type not found".to_string())),
        }
    }

    async fn delete_scan_type(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM scan_types WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_blocks_for_scan_type(&self, name: &str) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM scan_blocks WHERE scan_type = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }

    async fn insert_block(&self, new: NewScanBlock) -> Result<ScanBlock> {
        let row = sqlx::query(
            "INSERT INTO scan_blocks
                 (id, scan_type, date, start_time, end_time, duration_minutes,
                  total_slots, notes, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING *, 0::bigint AS confirmed_count",
        )
        .bind(Uuid::new_v4())
        .bind(&new.scan_type)
        .bind(new.date)
        .bind(new.start_time.to_naive_time())
        .bind(new.end_time.to_naive_time())
        .bind(new.duration)
        .bind(new.total_slots)
        .bind(&new.notes)
        .bind(&new.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(map_block_insert_error)?;
        block_from_row(&row)
    }

    async fn block_by_id(&self, id: Uuid) -> Result<Option<ScanBlock>> {
        let sql = format!(
            "SELECT s.*, {CONFIRMED_COUNT} AS confirmed_count
             FROM scan_blocks s WHERE s.id = $1"
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(block_from_row).transpose()
    }

    async fn list_blocks(&self, filter: BlockFilter) -> Result<Vec<ScanBlock>> {
        let mut qb: QueryBuilder<'_, sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT s.*, {CONFIRMED_COUNT} AS confirmed_count FROM scan_blocks s WHERE TRUE"
        ));
        if let Some(date) = filter.date {
            qb.push(" AND s.date = ");
            qb.push_bind(date);
        }
        if let Some((from, to)) = filter.date_range {
            qb.push(" AND s.date BETWEEN ");
            qb.push_bind(from);
            qb.push(" AND ");
            qb.push_bind(to);
        }
        if let Some(scan_type) = filter.scan_type {
            qb.push(" AND s.scan_type = ");
            qb.push_bind(scan_type);
        }
        if filter.only_available {
            qb.push(format!(" AND {CONFIRMED_COUNT} < s.total_slots"));
        }
        qb.push(" ORDER BY s.date, s.start_time");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(block_from_row).collect()
    }

    async fn blocks_in_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ScanBlock>> {
        self.list_blocks(BlockFilter {
            date_range: Some((from, to)),
            ..BlockFilter::default()
        })
        .await
    }

    async fn update_block(&self, id: Uuid, update: ScanBlockUpdate) -> Result<ScanBlock> {
        let row = sqlx::query(
            "UPDATE scan_blocks
             SET scan_type = $2, date = $3, start_time = $4, end_time = $5,
                 duration_minutes = $6, total_slots = $7, notes = $8
             WHERE id = $1
             RETURNING id",
        )
        .bind(id)
        .bind(&update.scan_type)
        .bind(update.date)
        .bind(update.start_time.to_naive_time())
        .bind(update.end_time.to_naive_time())
        .bind(update.duration)
        .bind(update.total_slots)
        .bind(&update.notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_block_insert_error)?;

        if row.is_none() {
            return Err(Error::NotFound("Scan block not found".to_string()));
        }

        self.block_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound("Scan block not found".to_string()))
    }

    async fn delete_block(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM scan_blocks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_booking(&self, new: NewBooking) -> Result<Booking> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "INSERT INTO bookings
                 (id, scan_block_id, scan_type, scan_date, duration_minutes,
                  slot_number, slot_start_time, slot_end_time, patient_name,
                  patient_phone, notes, user_id, booker_name, booker_user_id,
                  is_anonymous)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(new.scan_block_id)
        .bind(&new.scan_type)
        .bind(new.scan_date)
        .bind(new.duration)
        .bind(new.slot_number)
        .bind(new.slot_start_time.to_naive_time())
        .bind(new.slot_end_time.to_naive_time())
        .bind(&new.patient_name)
        .bind(&new.patient_phone)
        .bind(&new.notes)
        .bind(&new.user_id)
        .bind(&new.booker_name)
        .bind(&new.booker_user_id)
        .bind(new.user_id.is_none())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_booking_insert_error)?;

        // Re-derive the counter from the ledger rather than incrementing,
        // so concurrent commits cannot drift it.
        sqlx::query(
            "UPDATE scan_blocks
             SET booked_slots = (SELECT COUNT(*) FROM bookings
                                 WHERE scan_block_id = $1 AND status = 'confirmed')
             WHERE id = $1",
        )
        .bind(new.scan_block_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        booking_from_row(&row)
    }

    async fn booking_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        let row = sqlx::query("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(booking_from_row).transpose()
    }

    async fn confirmed_booking_for_slot(
        &self,
        block_id: Uuid,
        slot_number: i32,
    ) -> Result<Option<Booking>> {
        let row = sqlx::query(
            "SELECT * FROM bookings
             WHERE scan_block_id = $1 AND slot_number = $2 AND status = 'confirmed'",
        )
        .bind(block_id)
        .bind(slot_number)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(booking_from_row).transpose()
    }

    async fn confirmed_booking_for_user(
        &self,
        block_id: Uuid,
        user_id: &str,
    ) -> Result<Option<Booking>> {
        let row = sqlx::query(
            "SELECT * FROM bookings
             WHERE scan_block_id = $1 AND user_id = $2 AND status = 'confirmed'",
        )
        .bind(block_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(booking_from_row).transpose()
    }

    async fn confirmed_bookings_for_block(&self, block_id: Uuid) -> Result<Vec<Booking>> {
        let rows = sqlx::query(
            "SELECT * FROM bookings
             WHERE scan_block_id = $1 AND status = 'confirmed'
             ORDER BY slot_number",
        )
        .bind(block_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn confirmed_bookings_for_blocks(&self, block_ids: &[Uuid]) -> Result<Vec<Booking>> {
        let rows = sqlx::query(
            "SELECT * FROM bookings
             WHERE scan_block_id = ANY($1) AND status = 'confirmed'
             ORDER BY scan_block_id, slot_number",
        )
        .bind(block_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn confirmed_bookings_in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Booking>> {
        let rows = sqlx::query(
            "SELECT * FROM bookings
             WHERE scan_date BETWEEN $1 AND $2 AND status = 'confirmed'
             ORDER BY scan_date, slot_start_time, slot_number",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn bookings_for_user(&self, user_id: &str) -> Result<Vec<Booking>> {
        let rows = sqlx::query(
            "SELECT * FROM bookings
             WHERE user_id = $1 AND status = 'confirmed'
             ORDER BY booked_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn cancel_booking(&self, id: Uuid) -> Result<Booking> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Err(Error::NotFound("Booking not found".to_string()));
        };
        let booking = booking_from_row(&row)?;
        if booking.status != BookingStatus::Confirmed {
            return Err(Error::Conflict(
                "Only confirmed bookings can be cancelled".to_string(),
            ));
        }

        let row = sqlx::query("UPDATE bookings SET status = 'cancelled' WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE scan_blocks
             SET booked_slots = (SELECT COUNT(*) FROM bookings
                                 WHERE scan_block_id = $1 AND status = 'confirmed')
             WHERE id = $1",
        )
        .bind(booking.scan_block_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        booking_from_row(&row)
    }
}
