use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::route::Route;
use crate::CoreError;

/// Departure time of day, always stored zero-padded as `HH:MM` so that the
/// lexical order of the string is also the chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DepartureTime(String);

impl DepartureTime {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for DepartureTime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map_err(|_| CoreError::InvalidTime(s.to_string()))?;
        Ok(Self(parsed.format("%H:%M").to_string()))
    }
}

impl TryFrom<String> for DepartureTime {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DepartureTime> for String {
    fn from(time: DepartureTime) -> Self {
        time.0
    }
}

impl fmt::Display for DepartureTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One sailing: a route on a calendar date at a departure time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TripKey {
    pub route: Route,
    pub date: NaiveDate,
    pub time: DepartureTime,
}

impl TripKey {
    pub fn new(route: Route, date: NaiveDate, time: DepartureTime) -> Self {
        Self { route, date, time }
    }
}

impl fmt::Display for TripKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {} at {}", self.route, self.date, self.time)
    }
}

/// Seat numbers held by one leg of a booking. Seat numbers start at 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct SeatSet(BTreeSet<u32>);

impl SeatSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn from_numbers<I>(numbers: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut seats = BTreeSet::new();
        for number in numbers {
            if number == 0 {
                return Err(CoreError::InvalidSeatNumber("0".to_string()));
            }
            seats.insert(number);
        }
        Ok(Self(seats))
    }

    /// Parse the comma-joined storage form, e.g. `"1, 5,6"`. Blank entries are skipped.
    pub fn from_csv(raw: &str) -> Result<Self, CoreError> {
        let numbers = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<u32>()
                    .map_err(|_| CoreError::InvalidSeatNumber(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_numbers(numbers)
    }

    pub fn to_csv(&self) -> String {
        self.0
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, seat: u32) -> bool {
        self.0.contains(&seat)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    pub fn extend(&mut self, other: &SeatSet) {
        self.0.extend(other.0.iter().copied());
    }

    /// Lowest seat number present in both sets.
    pub fn first_overlap(&self, other: &SeatSet) -> Option<u32> {
        self.0.intersection(&other.0).next().copied()
    }

    pub fn max(&self) -> Option<u32> {
        self.0.iter().next_back().copied()
    }
}

impl TryFrom<Vec<u32>> for SeatSet {
    type Error = CoreError;

    fn try_from(value: Vec<u32>) -> Result<Self, Self::Error> {
        Self::from_numbers(value)
    }
}

impl From<SeatSet> for Vec<u32> {
    fn from(seats: SeatSet) -> Self {
        seats.0.into_iter().collect()
    }
}
