use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use ferry_core::repository::{ScheduleRepository, StoreResult};
use ferry_core::{DailySchedule, DepartureTime, RecurringSchedule, Route};
use sqlx::PgPool;

pub struct StoreScheduleRepository {
    pool: PgPool,
}

impl StoreScheduleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RecurringRow {
    id: i64,
    departure: String,
    destination: String,
    departure_time: String,
    active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<RecurringRow> for RecurringSchedule {
    type Error = Box<dyn std::error::Error + Send + Sync>;

    fn try_from(row: RecurringRow) -> Result<Self, Self::Error> {
        Ok(RecurringSchedule {
            id: row.id,
            route: Route::parse(&row.departure, &row.destination)?,
            time: row.departure_time.parse()?,
            active: row.active,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DailyRow {
    id: i64,
    departure: String,
    destination: String,
    schedule_date: NaiveDate,
    departure_time: String,
    active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<DailyRow> for DailySchedule {
    type Error = Box<dyn std::error::Error + Send + Sync>;

    fn try_from(row: DailyRow) -> Result<Self, Self::Error> {
        Ok(DailySchedule {
            id: row.id,
            route: Route::parse(&row.departure, &row.destination)?,
            date: row.schedule_date,
            time: row.departure_time.parse()?,
            active: row.active,
            created_at: row.created_at,
        })
    }
}

fn recurring_rows(rows: Vec<RecurringRow>) -> StoreResult<Vec<RecurringSchedule>> {
    rows.into_iter().map(RecurringSchedule::try_from).collect()
}

fn daily_rows(rows: Vec<DailyRow>) -> StoreResult<Vec<DailySchedule>> {
    rows.into_iter().map(DailySchedule::try_from).collect()
}

#[async_trait]
impl ScheduleRepository for StoreScheduleRepository {
    async fn active_daily(
        &self,
        route: &Route,
        date: NaiveDate,
    ) -> StoreResult<Vec<DailySchedule>> {
        let rows = sqlx::query_as::<_, DailyRow>(
            r#"
            SELECT id, departure, destination, schedule_date, departure_time, active, created_at
            FROM daily_schedules
            WHERE departure = $1 AND destination = $2 AND schedule_date = $3 AND active
            ORDER BY departure_time
            "#,
        )
        .bind(route.origin.name())
        .bind(route.destination.name())
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        daily_rows(rows)
    }

    async fn active_recurring(&self, route: &Route) -> StoreResult<Vec<RecurringSchedule>> {
        let rows = sqlx::query_as::<_, RecurringRow>(
            r#"
            SELECT id, departure, destination, departure_time, active, created_at
            FROM schedules
            WHERE departure = $1 AND destination = $2 AND active
            ORDER BY departure_time
            "#,
        )
        .bind(route.origin.name())
        .bind(route.destination.name())
        .fetch_all(&self.pool)
        .await?;

        recurring_rows(rows)
    }

    async fn list_recurring(&self) -> StoreResult<Vec<RecurringSchedule>> {
        let rows = sqlx::query_as::<_, RecurringRow>(
            r#"
            SELECT id, departure, destination, departure_time, active, created_at
            FROM schedules
            ORDER BY departure, destination, departure_time
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        recurring_rows(rows)
    }

    async fn list_daily(&self) -> StoreResult<Vec<DailySchedule>> {
        let rows = sqlx::query_as::<_, DailyRow>(
            r#"
            SELECT id, departure, destination, schedule_date, departure_time, active, created_at
            FROM daily_schedules
            ORDER BY schedule_date, departure, destination, departure_time
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        daily_rows(rows)
    }

    async fn find_recurring(
        &self,
        route: &Route,
        time: &DepartureTime,
    ) -> StoreResult<Option<RecurringSchedule>> {
        let row = sqlx::query_as::<_, RecurringRow>(
            r#"
            SELECT id, departure, destination, departure_time, active, created_at
            FROM schedules
            WHERE departure = $1 AND destination = $2 AND departure_time = $3
            LIMIT 1
            "#,
        )
        .bind(route.origin.name())
        .bind(route.destination.name())
        .bind(time.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(RecurringSchedule::try_from).transpose()
    }

    async fn insert_recurring(
        &self,
        route: &Route,
        time: &DepartureTime,
    ) -> StoreResult<RecurringSchedule> {
        let row = sqlx::query_as::<_, RecurringRow>(
            r#"
            INSERT INTO schedules (departure, destination, departure_time, active)
            VALUES ($1, $2, $3, TRUE)
            RETURNING id, departure, destination, departure_time, active, created_at
            "#,
        )
        .bind(route.origin.name())
        .bind(route.destination.name())
        .bind(time.as_str())
        .fetch_one(&self.pool)
        .await?;

        RecurringSchedule::try_from(row)
    }

    async fn find_daily(
        &self,
        route: &Route,
        date: NaiveDate,
        time: &DepartureTime,
    ) -> StoreResult<Option<DailySchedule>> {
        let row = sqlx::query_as::<_, DailyRow>(
            r#"
            SELECT id, departure, destination, schedule_date, departure_time, active, created_at
            FROM daily_schedules
            WHERE departure = $1 AND destination = $2 AND schedule_date = $3 AND departure_time = $4
            "#,
        )
        .bind(route.origin.name())
        .bind(route.destination.name())
        .bind(date)
        .bind(time.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(DailySchedule::try_from).transpose()
    }

    async fn insert_daily(
        &self,
        route: &Route,
        date: NaiveDate,
        time: &DepartureTime,
    ) -> StoreResult<DailySchedule> {
        let row = sqlx::query_as::<_, DailyRow>(
            r#"
            INSERT INTO daily_schedules
                (departure, destination, schedule_date, departure_time, active)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING id, departure, destination, schedule_date, departure_time, active, created_at
            "#,
        )
        .bind(route.origin.name())
        .bind(route.destination.name())
        .bind(date)
        .bind(time.as_str())
        .fetch_one(&self.pool)
        .await?;

        DailySchedule::try_from(row)
    }

    async fn delete_recurring(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM schedules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_daily(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM daily_schedules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
