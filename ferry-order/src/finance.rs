use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use ferry_core::{Booking, Route};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DAILY_WINDOW_DAYS: i64 = 30;
const TOP_ROUTES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: Decimal,
    pub bookings: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    /// 1 = January
    pub month: u32,
    pub revenue: Decimal,
    pub bookings: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRevenue {
    pub route: Route,
    pub bookings: u32,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethodRevenue {
    pub method: String,
    pub count: u32,
    pub revenue: Decimal,
}

/// Revenue analytics over every stored booking. Revenue is the booked
/// total, bucketed by creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueReport {
    /// Last 30 days including today, oldest first.
    pub daily: Vec<DailyRevenue>,
    /// Twelve months of the current year.
    pub monthly: Vec<MonthlyRevenue>,
    pub top_routes: Vec<RouteRevenue>,
    pub payment_methods: Vec<PaymentMethodRevenue>,
    pub total_revenue: Decimal,
    pub total_bookings: u32,
    pub average_booking_value: Decimal,
}

impl RevenueReport {
    pub fn build(bookings: &[Booking], now: DateTime<Utc>) -> Self {
        let today = now.date_naive();

        let daily = (0..DAILY_WINDOW_DAYS)
            .rev()
            .map(|offset| {
                let date = today - Duration::days(offset);
                let (revenue, count) = sum_where(bookings, |b| b.created_at.date_naive() == date);
                DailyRevenue { date, revenue, bookings: count }
            })
            .collect();

        let monthly = (1..=12)
            .map(|month| {
                let (revenue, count) = sum_where(bookings, |b| {
                    b.created_at.year() == today.year() && b.created_at.month() == month
                });
                MonthlyRevenue { month, revenue, bookings: count }
            })
            .collect();

        let mut routes: BTreeMap<Route, (u32, Decimal)> = BTreeMap::new();
        for booking in bookings {
            let entry = routes.entry(booking.outbound.trip.route).or_default();
            entry.0 += 1;
            entry.1 += booking.total_price;
        }
        let mut top_routes: Vec<RouteRevenue> = routes
            .into_iter()
            .map(|(route, (count, revenue))| RouteRevenue { route, bookings: count, revenue })
            .collect();
        // Stable sort keeps route order among ties
        top_routes.sort_by(|a, b| b.bookings.cmp(&a.bookings));
        top_routes.truncate(TOP_ROUTES);

        let mut methods: BTreeMap<&'static str, (u32, Decimal)> = BTreeMap::new();
        for booking in bookings {
            if let Some(payment) = &booking.payment {
                let entry = methods.entry(payment.method.label()).or_default();
                entry.0 += 1;
                entry.1 += booking.total_price;
            }
        }
        let payment_methods = methods
            .into_iter()
            .map(|(method, (count, revenue))| PaymentMethodRevenue {
                method: method.to_string(),
                count,
                revenue,
            })
            .collect();

        let (total_revenue, total_bookings) = sum_where(bookings, |_| true);
        let average_booking_value = if total_bookings > 0 {
            (total_revenue / Decimal::from(total_bookings)).round_dp(2)
        } else {
            Decimal::ZERO
        };

        Self {
            daily,
            monthly,
            top_routes,
            payment_methods,
            total_revenue,
            total_bookings,
            average_booking_value,
        }
    }
}

/// Headline numbers for the admin landing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_bookings: u32,
    /// Bookings travelling today or later.
    pub upcoming_bookings: u32,
    pub recurring_schedules: u32,
    pub revenue_today: Decimal,
    pub revenue_this_month: Decimal,
    pub revenue_all_time: Decimal,
}

impl DashboardStats {
    pub fn build(bookings: &[Booking], recurring_schedules: usize, now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let (revenue_today, _) = sum_where(bookings, |b| b.created_at.date_naive() == today);
        let (revenue_this_month, _) = sum_where(bookings, |b| {
            b.created_at.year() == today.year() && b.created_at.month() == today.month()
        });
        let (revenue_all_time, total_bookings) = sum_where(bookings, |_| true);
        let (_, upcoming_bookings) = sum_where(bookings, |b| b.outbound.trip.date >= today);

        Self {
            total_bookings,
            upcoming_bookings,
            recurring_schedules: recurring_schedules as u32,
            revenue_today,
            revenue_this_month,
            revenue_all_time,
        }
    }
}

fn sum_where<F>(bookings: &[Booking], predicate: F) -> (Decimal, u32)
where
    F: Fn(&Booking) -> bool,
{
    bookings
        .iter()
        .filter(|b| predicate(b))
        .fold((Decimal::ZERO, 0), |(revenue, count), b| (revenue + b.total_price, count + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ferry_core::{
        BookingStatus, Leg, Passenger, Payment, PaymentMethod, PaymentStatus, Port, TripKey,
    };
    use ferry_shared::Masked;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 15, 9, 0, 0).unwrap()
    }

    fn booking(
        origin: Port,
        destination: Port,
        created_at: DateTime<Utc>,
        travel: NaiveDate,
        total: i64,
        method: Option<PaymentMethod>,
    ) -> Booking {
        let route = Route::new(origin, destination).unwrap();
        Booking {
            id: Uuid::new_v4(),
            reference: Uuid::new_v4().simple().to_string()[..8].to_uppercase(),
            user_id: None,
            passenger: Passenger {
                name: "Report".to_string(),
                email: Masked::new("report@example.com".to_string()),
                phone: "1".to_string(),
            },
            outbound: Leg::new(
                TripKey::new(route, travel, "08:00".parse().unwrap()),
                Decimal::from(total),
            ),
            return_leg: None,
            seats: 1,
            total_price: Decimal::from(total),
            status: if method.is_some() {
                BookingStatus::PaymentRecorded
            } else {
                BookingStatus::PendingSeats
            },
            payment: method.map(|method| Payment {
                method,
                status: PaymentStatus::Paid,
                info: None,
                recorded_at: created_at,
            }),
            created_at,
            updated_at: created_at,
        }
    }

    fn sample() -> Vec<Booking> {
        let today = now().date_naive();
        let last_month = Utc.with_ymd_and_hms(2030, 5, 20, 10, 0, 0).unwrap();
        let last_year = Utc.with_ymd_and_hms(2029, 6, 15, 10, 0, 0).unwrap();
        vec![
            booking(Port::Male, Port::Hulhumale, now(), today, 100, Some(PaymentMethod::Card)),
            booking(
                Port::Male,
                Port::Hulhumale,
                now(),
                today,
                200,
                Some(PaymentMethod::BankTransfer),
            ),
            booking(Port::Male, Port::Maafushi, last_month, today - Duration::days(1), 400, None),
            booking(
                Port::VelanaAirport,
                Port::Male,
                last_year,
                today - Duration::days(365),
                300,
                Some(PaymentMethod::Card),
            ),
        ]
    }

    #[test]
    fn test_revenue_report() {
        let report = RevenueReport::build(&sample(), now());

        assert_eq!(report.daily.len(), 30);
        assert_eq!(report.daily.last().unwrap().date, now().date_naive());
        assert_eq!(report.daily.last().unwrap().revenue, Decimal::from(300));
        assert_eq!(report.daily.last().unwrap().bookings, 2);
        assert_eq!(report.daily[4].date, NaiveDate::from_ymd_opt(2030, 5, 21).unwrap());
        assert_eq!(report.daily[3].revenue, Decimal::from(400));

        assert_eq!(report.monthly.len(), 12);
        assert_eq!(report.monthly[5].revenue, Decimal::from(300));
        assert_eq!(report.monthly[4].revenue, Decimal::from(400));
        assert_eq!(report.monthly[0].bookings, 0);

        assert_eq!(report.top_routes[0].route, Route::new(Port::Male, Port::Hulhumale).unwrap());
        assert_eq!(report.top_routes[0].bookings, 2);
        assert_eq!(report.top_routes.len(), 3);

        let card = report.payment_methods.iter().find(|m| m.method == "Card").unwrap();
        assert_eq!(card.count, 2);
        assert_eq!(card.revenue, Decimal::from(400));
        assert_eq!(report.payment_methods.len(), 2);

        assert_eq!(report.total_revenue, Decimal::from(1000));
        assert_eq!(report.total_bookings, 4);
        assert_eq!(report.average_booking_value, Decimal::from(250));
    }

    #[test]
    fn test_empty_report_has_zero_average() {
        let report = RevenueReport::build(&[], now());
        assert_eq!(report.average_booking_value, Decimal::ZERO);
        assert!(report.top_routes.is_empty());
        assert!(report.daily.iter().all(|d| d.bookings == 0));
    }

    #[test]
    fn test_dashboard_stats() {
        let stats = DashboardStats::build(&sample(), 5, now());
        assert_eq!(stats.total_bookings, 4);
        assert_eq!(stats.upcoming_bookings, 2);
        assert_eq!(stats.recurring_schedules, 5);
        assert_eq!(stats.revenue_today, Decimal::from(300));
        assert_eq!(stats.revenue_this_month, Decimal::from(300));
        assert_eq!(stats.revenue_all_time, Decimal::from(1000));
    }
}
