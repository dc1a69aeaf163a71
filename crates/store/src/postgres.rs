use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookingId, TravelId, UserId};
use domain::{Booking, BookingError, BookingStatus, Money, TravelOffering, UserIdentity};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{BookingStore, TravelStore, UserStore},
};

const TRAVEL_COLUMNS: &str =
    "id, slug, name, description, starting_date, ending_date, price, total_seats, available_seats";

const BOOKING_COLUMNS: &str = "id, user_id, travel_id, selected_seats, total_price, status, \
     expiration_time, created_at, updated_at";

/// PostgreSQL-backed store.
///
/// Seat adjustments lock the offering row with `SELECT ... FOR UPDATE`;
/// pending-booking uniqueness is enforced by the partial unique index
/// `uniq_pending_booking_per_user_travel`; status changes are conditional
/// `UPDATE ... WHERE status = $from`. Expiry locks the offering and the
/// booking in one transaction so the status and the counter move together.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_travel(row: PgRow) -> Result<TravelOffering> {
        Ok(TravelOffering {
            id: TravelId::from_uuid(row.try_get::<Uuid, _>("id")?),
            slug: row.try_get("slug")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            starting_date: row.try_get("starting_date")?,
            ending_date: row.try_get("ending_date")?,
            price: Money::from_cents(row.try_get("price")?),
            total_seats: row.try_get("total_seats")?,
            available_seats: row.try_get("available_seats")?,
        })
    }

    fn row_to_user(row: PgRow) -> Result<UserIdentity> {
        Ok(UserIdentity {
            id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
            email: row.try_get("email")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_booking(row: PgRow) -> Result<Booking> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<BookingStatus>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        Ok(Booking {
            id: BookingId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            travel_id: TravelId::from_uuid(row.try_get::<Uuid, _>("travel_id")?),
            selected_seats: row.try_get("selected_seats")?,
            total_price: Money::from_cents(row.try_get("total_price")?),
            status,
            expiration_time: row.try_get("expiration_time")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Translates constraint violations into the business errors they encode.
fn map_constraint_violation(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        let rejection = match db_err.constraint() {
            Some("uniq_pending_booking_per_user_travel") => {
                Some(BookingError::DuplicatePendingBooking)
            }
            Some("fk_bookings_travel") => Some(BookingError::TravelNotFound),
            Some("unique_user_email") => Some(BookingError::UserAlreadyExists),
            Some("unique_travel_slug") => Some(BookingError::InvalidTravel {
                reason: "slug already exists".to_string(),
            }),
            Some("available_seats_within_capacity") => Some(BookingError::InvalidTravel {
                reason: "available seats outside capacity".to_string(),
            }),
            _ => None,
        };
        if let Some(rejection) = rejection {
            return StoreError::Rejected(rejection);
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl TravelStore for PostgresStore {
    async fn insert_travel(&self, travel: TravelOffering) -> Result<TravelOffering> {
        sqlx::query(
            r#"
            INSERT INTO travels (id, slug, name, description, starting_date, ending_date, price, total_seats, available_seats)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(travel.id.as_uuid())
        .bind(&travel.slug)
        .bind(&travel.name)
        .bind(&travel.description)
        .bind(travel.starting_date)
        .bind(travel.ending_date)
        .bind(travel.price.cents())
        .bind(travel.total_seats)
        .bind(travel.available_seats)
        .execute(&self.pool)
        .await
        .map_err(map_constraint_violation)?;

        Ok(travel)
    }

    async fn get_travel(&self, id: TravelId) -> Result<Option<TravelOffering>> {
        let row = sqlx::query(&format!("SELECT {TRAVEL_COLUMNS} FROM travels WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_travel).transpose()
    }

    async fn get_travel_by_slug(&self, slug: &str) -> Result<Option<TravelOffering>> {
        let row = sqlx::query(&format!("SELECT {TRAVEL_COLUMNS} FROM travels WHERE slug = $1"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_travel).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn adjust_available_seats(&self, id: TravelId, delta: i32) -> Result<TravelOffering> {
        let mut tx = self.pool.begin().await?;

        // Row lock: concurrent adjustments on this offering wait here
        let row = sqlx::query(&format!(
            "SELECT {TRAVEL_COLUMNS} FROM travels WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let mut travel = match row {
            Some(row) => Self::row_to_travel(row)?,
            None => return Err(BookingError::TravelNotFound.into()),
        };

        // Dropping `tx` on the error path rolls back and releases the lock
        let new_available = travel.apply_seat_delta(delta)?;

        sqlx::query("UPDATE travels SET available_seats = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(new_available)
            .execute(&mut *tx)
            .await
            .map_err(map_constraint_violation)?;

        tx.commit().await?;

        travel.available_seats = new_available;
        Ok(travel)
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn insert_user(&self, user: UserIdentity) -> Result<UserIdentity> {
        sqlx::query("INSERT INTO users (id, email, created_at) VALUES ($1, $2, $3)")
            .bind(user.id.as_uuid())
            .bind(&user.email)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(map_constraint_violation)?;

        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserIdentity>> {
        let row = sqlx::query("SELECT id, email, created_at FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserIdentity>> {
        let row = sqlx::query("SELECT id, email, created_at FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }
}

#[async_trait]
impl BookingStore for PostgresStore {
    async fn insert_booking(&self, booking: Booking) -> Result<Booking> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, user_id, travel_id, selected_seats, total_price, status, expiration_time, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(booking.id.as_uuid())
        .bind(booking.user_id.as_uuid())
        .bind(booking.travel_id.as_uuid())
        .bind(booking.selected_seats)
        .bind(booking.total_price.cents())
        .bind(booking.status.as_str())
        .bind(booking.expiration_time)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_constraint_violation)?;

        Ok(booking)
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_booking).transpose()
    }

    async fn find_pending_booking(
        &self,
        user_id: UserId,
        travel_id: TravelId,
    ) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE user_id = $1 AND travel_id = $2 AND status = 'pending'"
        ))
        .bind(user_id.as_uuid())
        .bind(travel_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_booking).transpose()
    }

    async fn find_expired_pending(&self, now: DateTime<Utc>) -> Result<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE status = 'pending' AND expiration_time < $1 \
             ORDER BY expiration_time ASC"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_booking).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn transition_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Booking>> {
        if !from.can_transition_to(to) {
            return Err(BookingError::InvalidTransition { from, to }.into());
        }

        let row = sqlx::query(&format!(
            "UPDATE bookings SET status = $3, updated_at = $4 \
             WHERE id = $1 AND status = $2 \
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_constraint_violation)?;

        if let Some(row) = row {
            return Self::row_to_booking(row).map(Some);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM bookings WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        if exists {
            Ok(None)
        } else {
            Err(BookingError::BookingNotFound.into())
        }
    }

    #[tracing::instrument(skip(self))]
    async fn expire_and_release(
        &self,
        id: BookingId,
        now: DateTime<Utc>,
    ) -> Result<Option<Booking>> {
        let mut tx = self.pool.begin().await?;

        let travel_id: Option<Uuid> =
            sqlx::query_scalar("SELECT travel_id FROM bookings WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(travel_id) = travel_id else {
            return Err(BookingError::BookingNotFound.into());
        };

        // Offering row before booking row, the order every sweep locks in
        let row = sqlx::query(&format!(
            "SELECT {TRAVEL_COLUMNS} FROM travels WHERE id = $1 FOR UPDATE"
        ))
        .bind(travel_id)
        .fetch_optional(&mut *tx)
        .await?;
        let travel = match row {
            Some(row) => Self::row_to_travel(row)?,
            None => return Err(BookingError::TravelNotFound.into()),
        };

        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_one(&mut *tx)
        .await?;
        let mut booking = Self::row_to_booking(row)?;

        // Dropping `tx` on any early return rolls back both rows
        if booking.status != BookingStatus::Pending {
            return Ok(None);
        }
        let new_available = travel.apply_seat_delta(booking.selected_seats)?;
        booking.transition_to(BookingStatus::Expired, now)?;

        sqlx::query("UPDATE travels SET available_seats = $2 WHERE id = $1")
            .bind(travel_id)
            .bind(new_available)
            .execute(&mut *tx)
            .await
            .map_err(map_constraint_violation)?;

        sqlx::query("UPDATE bookings SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(booking.status.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(booking))
    }

    async fn list_bookings_for_user(&self, user_id: UserId) -> Result<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_booking).collect()
    }
}
