use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::route::Route;
use crate::trip::DepartureTime;

/// Standing departure offered every day until deactivated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringSchedule {
    pub id: i64,
    pub route: Route,
    pub time: DepartureTime,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Departure valid for one calendar date only. While any active entry exists
/// for a route and date, the recurring timetable is ignored for that date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySchedule {
    pub id: i64,
    pub route: Route,
    pub date: NaiveDate,
    pub time: DepartureTime,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
