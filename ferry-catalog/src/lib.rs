pub mod inventory;
pub mod pricing;
pub mod schedule;

pub use inventory::{Availability, CapacityEngine, CapacityError};
pub use pricing::{ConfigStore, PriceTable, PricingError, RoutePrice};
pub use schedule::{
    AvailabilityOverview, RouteTimetable, ScheduleError, ScheduleListing, ScheduleResolver,
    UpcomingSailing,
};
