use chrono::NaiveDate;
use ferry_core::repository::ScheduleRepository;
use ferry_core::{DailySchedule, DepartureTime, Port, RecurringSchedule, Route, TripKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::inventory::{CapacityEngine, CapacityError};

/// Timetable used for a route when no schedule has been entered for it.
const FALLBACK_ROUTE_TIMES: &[(Port, Port, &[&str])] = &[
    (Port::Male, Port::Hulhumale, &["08:00", "10:00", "14:00", "18:00"]),
    (Port::Male, Port::Maafushi, &["09:00", "13:00", "17:00"]),
    (Port::Male, Port::Guraidhoo, &["07:30", "12:00", "16:00"]),
    (Port::Male, Port::Dhiffushi, &["08:30", "15:00"]),
    (Port::Male, Port::Rasdhoo, &["09:30", "14:30"]),
    (Port::Male, Port::Thinadhoo, &["07:00", "16:30"]),
    (Port::Male, Port::VelanaAirport, &["07:00", "11:00", "15:00"]),
    (Port::VelanaAirport, Port::Male, &["07:00", "11:00", "15:00"]),
    (Port::VelanaAirport, Port::Hulhumale, &["08:00", "12:00", "16:00"]),
    (Port::VelanaAirport, Port::Maafushi, &["09:00", "13:00", "17:00"]),
    (Port::VelanaAirport, Port::Guraidhoo, &["07:30", "12:00", "16:00"]),
    (Port::VelanaAirport, Port::Dhiffushi, &["08:30", "15:00"]),
    (Port::VelanaAirport, Port::Rasdhoo, &["09:30", "14:30"]),
    (Port::VelanaAirport, Port::Thinadhoo, &["07:00", "16:30"]),
];

/// Fallback times for a route, empty when the route has none.
pub fn fallback_times(route: &Route) -> Vec<DepartureTime> {
    FALLBACK_ROUTE_TIMES
        .iter()
        .find(|(origin, destination, _)| {
            *origin == route.origin && *destination == route.destination
        })
        .map(|(_, _, times)| times.iter().filter_map(|t| t.parse().ok()).collect())
        .unwrap_or_default()
}

/// Every route with a fallback timetable.
pub fn fallback_routes() -> Vec<Route> {
    FALLBACK_ROUTE_TIMES
        .iter()
        .filter_map(|(origin, destination, _)| Route::new(*origin, *destination).ok())
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Schedule not found: {0}")]
    NotFound(i64),

    #[error(transparent)]
    Capacity(#[from] CapacityError),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

fn persistence(e: Box<dyn std::error::Error + Send + Sync>) -> ScheduleError {
    ScheduleError::Persistence(e.to_string())
}

/// All stored schedule entries, as shown on the admin page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleListing {
    pub recurring: Vec<RecurringSchedule>,
    pub daily: Vec<DailySchedule>,
}

/// An upcoming date-specific sailing with its live seat count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingSailing {
    pub id: i64,
    pub route: Route,
    pub date: NaiveDate,
    pub time: DepartureTime,
    pub available_seats: u32,
}

/// Recurring times for one route; `fallback` marks routes with no entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteTimetable {
    pub route: Route,
    pub times: Vec<DepartureTime>,
    pub fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityOverview {
    pub daily: Vec<UpcomingSailing>,
    pub recurring: Vec<RouteTimetable>,
}

/// Resolves departure times from date-specific, recurring and fallback
/// timetables, and owns the admin operations on those timetables.
pub struct ScheduleResolver {
    schedules: Arc<dyn ScheduleRepository>,
    capacity: Arc<CapacityEngine>,
}

impl ScheduleResolver {
    pub fn new(schedules: Arc<dyn ScheduleRepository>, capacity: Arc<CapacityEngine>) -> Self {
        Self { schedules, capacity }
    }

    /// Candidate times before any seat check. Date-specific entries for the
    /// date replace recurring ones entirely; recurring entries replace the
    /// fallback table.
    pub async fn candidate_times(
        &self,
        route: &Route,
        date: NaiveDate,
    ) -> Result<Vec<DepartureTime>, ScheduleError> {
        let daily = self.schedules.active_daily(route, date).await.map_err(persistence)?;
        let times: BTreeSet<DepartureTime> = if !daily.is_empty() {
            daily.into_iter().map(|d| d.time).collect()
        } else {
            let recurring = self.schedules.active_recurring(route).await.map_err(persistence)?;
            if !recurring.is_empty() {
                recurring.into_iter().map(|s| s.time).collect()
            } else {
                fallback_times(route).into_iter().collect()
            }
        };
        Ok(times.into_iter().collect())
    }

    /// Departure times on `date` that still have at least one seat, ascending.
    pub async fn times_for(
        &self,
        route: &Route,
        date: NaiveDate,
    ) -> Result<Vec<DepartureTime>, ScheduleError> {
        let mut available = Vec::new();
        for time in self.candidate_times(route, date).await? {
            let trip = TripKey::new(*route, date, time);
            if self.capacity.remaining_seats(&trip).await? > 0 {
                available.push(trip.time);
            } else {
                debug!("{} is full", trip);
            }
        }
        Ok(available)
    }

    pub async fn list(&self) -> Result<ScheduleListing, ScheduleError> {
        Ok(ScheduleListing {
            recurring: self.schedules.list_recurring().await.map_err(persistence)?,
            daily: self.schedules.list_daily().await.map_err(persistence)?,
        })
    }

    /// Returns the entry and whether it was newly created.
    pub async fn add_recurring(
        &self,
        route: Route,
        time: DepartureTime,
    ) -> Result<(RecurringSchedule, bool), ScheduleError> {
        let existing = self.schedules.find_recurring(&route, &time).await.map_err(persistence)?;
        if let Some(existing) = existing {
            return Ok((existing, false));
        }
        let entry = self.schedules.insert_recurring(&route, &time).await.map_err(persistence)?;
        info!("Recurring sailing added: {} at {}", route, time);
        Ok((entry, true))
    }

    /// Returns the entry and whether it was newly created.
    pub async fn add_daily(
        &self,
        route: Route,
        date: NaiveDate,
        time: DepartureTime,
    ) -> Result<(DailySchedule, bool), ScheduleError> {
        let existing = self.schedules.find_daily(&route, date, &time).await.map_err(persistence)?;
        if let Some(existing) = existing {
            return Ok((existing, false));
        }
        let entry = self.schedules.insert_daily(&route, date, &time).await.map_err(persistence)?;
        info!("Sailing added for {}: {} at {}", date, route, time);
        Ok((entry, true))
    }

    pub async fn delete_recurring(&self, id: i64) -> Result<(), ScheduleError> {
        if !self.schedules.delete_recurring(id).await.map_err(persistence)? {
            return Err(ScheduleError::NotFound(id));
        }
        info!("Recurring sailing {} deleted", id);
        Ok(())
    }

    pub async fn delete_daily(&self, id: i64) -> Result<(), ScheduleError> {
        if !self.schedules.delete_daily(id).await.map_err(persistence)? {
            return Err(ScheduleError::NotFound(id));
        }
        info!("Date-specific sailing {} deleted", id);
        Ok(())
    }

    /// Copy every fallback time into the recurring timetable. Safe to repeat;
    /// returns the number of entries added.
    pub async fn seed_from_fallback(&self) -> Result<usize, ScheduleError> {
        let mut added = 0;
        for route in fallback_routes() {
            for time in fallback_times(&route) {
                if self.add_recurring(route, time).await?.1 {
                    added += 1;
                }
            }
        }
        info!("Seeded {} recurring sailings", added);
        Ok(added)
    }

    /// Upcoming date-specific sailings with live seat counts, and the
    /// recurring timetable per route with fallback times filled in.
    pub async fn availability_overview(
        &self,
        today: NaiveDate,
    ) -> Result<AvailabilityOverview, ScheduleError> {
        let mut upcoming: Vec<DailySchedule> = self
            .schedules
            .list_daily()
            .await
            .map_err(persistence)?
            .into_iter()
            .filter(|d| d.active && d.date >= today)
            .collect();
        upcoming.sort_by(|a, b| (a.date, a.route, &a.time).cmp(&(b.date, b.route, &b.time)));

        let mut daily = Vec::with_capacity(upcoming.len());
        for entry in upcoming {
            let trip = TripKey::new(entry.route, entry.date, entry.time.clone());
            daily.push(UpcomingSailing {
                id: entry.id,
                route: entry.route,
                date: entry.date,
                available_seats: self.capacity.remaining_seats(&trip).await?,
                time: entry.time,
            });
        }

        let mut by_route: BTreeMap<Route, BTreeSet<DepartureTime>> = BTreeMap::new();
        for entry in self.schedules.list_recurring().await.map_err(persistence)? {
            if entry.active {
                by_route.entry(entry.route).or_default().insert(entry.time);
            }
        }

        let mut recurring: Vec<RouteTimetable> = by_route
            .into_iter()
            .map(|(route, times)| RouteTimetable {
                route,
                times: times.into_iter().collect(),
                fallback: false,
            })
            .collect();
        for route in fallback_routes() {
            if !recurring.iter().any(|t| t.route == route) {
                recurring.push(RouteTimetable {
                    route,
                    times: fallback_times(&route),
                    fallback: true,
                });
            }
        }
        recurring.sort_by(|a, b| a.route.cmp(&b.route));

        Ok(AvailabilityOverview { daily, recurring })
    }
}
