pub mod finance;
pub mod manager;
pub mod models;
pub mod payment;

pub use finance::{DashboardStats, RevenueReport};
pub use manager::{BookingError, BookingManager};
pub use models::{NewBooking, SeatMap};
pub use payment::PaymentInput;
