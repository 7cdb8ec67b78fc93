use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use ferry_core::repository::{BookingRepository, StoreResult};
use ferry_core::{
    Booking, BookingStatus, Leg, LegKind, Passenger, Payment, Route, SeatSet, TripKey,
};
use ferry_shared::Masked;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

pub struct StoreBookingRepository {
    pool: PgPool,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const BOOKING_COLUMNS: &str = r#"
    id, booking_reference, user_id, name, email, phone,
    departure, destination, travel_date, departure_time, price_per_seat, selected_seats,
    is_roundtrip, return_date, return_time, return_price_per_seat, return_selected_seats,
    seats, total_price, status,
    payment_method, payment_status, payment_info, payment_recorded_at,
    created_at, updated_at
"#;

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    booking_reference: String,
    user_id: Option<String>,
    name: String,
    email: String,
    phone: String,
    departure: String,
    destination: String,
    travel_date: NaiveDate,
    departure_time: String,
    price_per_seat: Decimal,
    selected_seats: String,
    is_roundtrip: bool,
    return_date: Option<NaiveDate>,
    return_time: Option<String>,
    return_price_per_seat: Option<Decimal>,
    return_selected_seats: Option<String>,
    seats: i32,
    total_price: Decimal,
    status: String,
    payment_method: Option<String>,
    payment_status: Option<String>,
    payment_info: Option<String>,
    payment_recorded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = Box<dyn std::error::Error + Send + Sync>;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let route = Route::parse(&row.departure, &row.destination)?;

        let outbound = Leg {
            trip: TripKey::new(route, row.travel_date, row.departure_time.parse()?),
            price_per_seat: row.price_per_seat,
            assigned_seats: SeatSet::from_csv(&row.selected_seats)?,
        };

        // The return leg sails the reversed route
        let return_leg = match (row.is_roundtrip, row.return_date, row.return_time) {
            (true, Some(date), Some(time)) => Some(Leg {
                trip: TripKey::new(route.reverse(), date, time.parse()?),
                price_per_seat: row.return_price_per_seat.unwrap_or(row.price_per_seat),
                assigned_seats: SeatSet::from_csv(
                    row.return_selected_seats.as_deref().unwrap_or(""),
                )?,
            }),
            (true, _, _) => {
                return Err(format!(
                    "round-trip booking {} lacks return date/time",
                    row.booking_reference
                )
                .into())
            }
            _ => None,
        };

        let payment = match (row.payment_method, row.payment_status) {
            (Some(method), Some(status)) => Some(Payment {
                method: method.parse()?,
                status: status.parse()?,
                info: row.payment_info,
                recorded_at: row.payment_recorded_at.unwrap_or(row.updated_at),
            }),
            _ => None,
        };

        Ok(Booking {
            id: row.id,
            reference: row.booking_reference,
            user_id: row.user_id,
            passenger: Passenger {
                name: row.name,
                email: Masked::new(row.email),
                phone: row.phone,
            },
            outbound,
            return_leg,
            seats: u32::try_from(row.seats)?,
            total_price: row.total_price,
            status: row.status.parse::<BookingStatus>()?,
            payment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn payment_method_key(booking: &Booking) -> Option<String> {
    booking.payment.as_ref().map(|p| {
        serde_json::to_value(p.method)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| p.method.label().to_string())
    })
}

fn rows_into_bookings(rows: Vec<BookingRow>) -> StoreResult<Vec<Booking>> {
    rows.into_iter().map(Booking::try_from).collect()
}

#[async_trait]
impl BookingRepository for StoreBookingRepository {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<()> {
        let route = booking.outbound.trip.route;
        let return_leg = booking.return_leg.as_ref();

        sqlx::query(
            r#"
            INSERT INTO ferry_bookings (
                id, booking_reference, user_id, name, email, phone,
                departure, destination, travel_date, departure_time, price_per_seat, selected_seats,
                is_roundtrip, return_date, return_time,
                return_price_per_seat, return_selected_seats,
                seats, total_price, status,
                payment_method, payment_status, payment_info, payment_recorded_at,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21, $22, $23, $24, $25, $26)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.reference)
        .bind(&booking.user_id)
        .bind(&booking.passenger.name)
        .bind(booking.passenger.email.expose())
        .bind(&booking.passenger.phone)
        .bind(route.origin.name())
        .bind(route.destination.name())
        .bind(booking.outbound.trip.date)
        .bind(booking.outbound.trip.time.as_str())
        .bind(booking.outbound.price_per_seat)
        .bind(booking.outbound.assigned_seats.to_csv())
        .bind(booking.is_round_trip())
        .bind(return_leg.map(|l| l.trip.date))
        .bind(return_leg.map(|l| l.trip.time.to_string()))
        .bind(return_leg.map(|l| l.price_per_seat))
        .bind(return_leg.map(|l| l.assigned_seats.to_csv()))
        .bind(i32::try_from(booking.seats)?)
        .bind(booking.total_price)
        .bind(booking.status.as_str())
        .bind(payment_method_key(booking))
        .bind(booking.payment.as_ref().map(|p| p.status.as_str()))
        .bind(booking.payment.as_ref().and_then(|p| p.info.clone()))
        .bind(booking.payment.as_ref().map(|p| p.recorded_at))
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_booking(&self, booking: &Booking) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE ferry_bookings
            SET selected_seats = $2,
                return_selected_seats = $3,
                total_price = $4,
                status = $5,
                payment_method = $6,
                payment_status = $7,
                payment_info = $8,
                payment_recorded_at = $9,
                updated_at = $10
            WHERE booking_reference = $1
            "#,
        )
        .bind(&booking.reference)
        .bind(booking.outbound.assigned_seats.to_csv())
        .bind(booking.return_leg.as_ref().map(|l| l.assigned_seats.to_csv()))
        .bind(booking.total_price)
        .bind(booking.status.as_str())
        .bind(payment_method_key(booking))
        .bind(booking.payment.as_ref().map(|p| p.status.as_str()))
        .bind(booking.payment.as_ref().and_then(|p| p.info.clone()))
        .bind(booking.payment.as_ref().map(|p| p.recorded_at))
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(format!("booking {} does not exist", booking.reference).into());
        }
        Ok(())
    }

    async fn get_booking(&self, reference: &str) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM ferry_bookings WHERE booking_reference = $1",
            BOOKING_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Booking::try_from).transpose()
    }

    async fn reference_exists(&self, reference: &str) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM ferry_bookings WHERE booking_reference = $1)",
        )
        .bind(reference)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn delete_booking(&self, reference: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM ferry_bookings WHERE booking_reference = $1")
            .bind(reference)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn booked_seat_count(&self, trip: &TripKey) -> StoreResult<u32> {
        let booked: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(seats), 0)::BIGINT
            FROM ferry_bookings
            WHERE departure = $1 AND destination = $2 AND travel_date = $3 AND departure_time = $4
            "#,
        )
        .bind(trip.route.origin.name())
        .bind(trip.route.destination.name())
        .bind(trip.date)
        .bind(trip.time.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(u32::try_from(booked)?)
    }

    async fn bookings_on_trip(&self, trip: &TripKey, leg: LegKind) -> StoreResult<Vec<Booking>> {
        let rows = match leg {
            LegKind::Outbound => {
                sqlx::query_as::<_, BookingRow>(&format!(
                    r#"SELECT {} FROM ferry_bookings
                       WHERE departure = $1 AND destination = $2
                         AND travel_date = $3 AND departure_time = $4"#,
                    BOOKING_COLUMNS
                ))
                .bind(trip.route.origin.name())
                .bind(trip.route.destination.name())
                .bind(trip.date)
                .bind(trip.time.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            LegKind::Return => {
                // Return legs are stored against the outbound columns, reversed
                sqlx::query_as::<_, BookingRow>(&format!(
                    r#"SELECT {} FROM ferry_bookings
                       WHERE is_roundtrip AND departure = $1 AND destination = $2
                         AND return_date = $3 AND return_time = $4"#,
                    BOOKING_COLUMNS
                ))
                .bind(trip.route.destination.name())
                .bind(trip.route.origin.name())
                .bind(trip.date)
                .bind(trip.time.as_str())
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows_into_bookings(rows)
    }

    async fn list_bookings(&self) -> StoreResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM ferry_bookings ORDER BY created_at DESC",
            BOOKING_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows_into_bookings(rows)
    }

    async fn list_bookings_for_user(&self, user_id: &str) -> StoreResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM ferry_bookings WHERE user_id = $1 ORDER BY created_at DESC",
            BOOKING_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows_into_bookings(rows)
    }

    async fn delete_bookings_created_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM ferry_bookings WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
