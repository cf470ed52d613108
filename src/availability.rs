//! Calendar availability: a soft hold computed from confirmed orders, stock is never reserved.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::domain::{Order, OrderStatus, Product};

/// Confirmed bookings of one product. Days are counted on demand, so the
/// cost of a query does not depend on how long a rental runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookedCounts {
    bookings: Vec<Order>,
    total_stock: u32,
}

/// Keeps the CONFIRMED orders of `product` with both dates set.
pub fn booked_counts(orders: &[Order], product: &Product) -> BookedCounts {
    let bookings = orders
        .iter()
        .filter(|order| order.product_id == product.id && order.status == OrderStatus::Confirmed)
        .filter(|order| order.rental_start_date.is_some() && order.rental_end_date.is_some())
        .cloned()
        .collect();

    BookedCounts {
        bookings,
        total_stock: product.total_stock,
    }
}

impl BookedCounts {
    /// Bookings covering `day`, both ends inclusive.
    pub fn on(&self, day: NaiveDate) -> u32 {
        self.bookings.iter().filter(|order| order.covers_day(day)).count() as u32
    }

    pub fn is_fully_booked(&self, day: NaiveDate) -> bool {
        self.on(day) >= self.total_stock
    }

    /// Rentals start on Saturdays that are neither past nor fully booked.
    pub fn is_selectable_start(&self, day: NaiveDate, today: NaiveDate) -> bool {
        day.weekday() == Weekday::Sat && day >= today && !self.is_fully_booked(day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RentalPeriod, SavedLocation};
    use chrono::{TimeZone, Utc};

    fn booking(status: OrderStatus, from: (u32, u32), to: (u32, u32)) -> Order {
        Order {
            id: format!("o-{}-{}", from.1, to.1),
            user_id: "u1".into(),
            product_id: "p1".into(),
            product_name: "PS VR2".into(),
            product_image: String::new(),
            duration: 1,
            period: RentalPeriod::Weeks,
            total_price: 60.0,
            status,
            delivery_location: SavedLocation::new("Home", "1 Main St", "10001", 0.0, 0.0),
            created_at: Utc::now(),
            rental_start_date: Some(Utc.with_ymd_and_hms(2025, from.0, from.1, 10, 0, 0).unwrap()),
            rental_end_date: Some(Utc.with_ymd_and_hms(2025, to.0, to.1, 10, 0, 0).unwrap()),
            subscription_extra: false,
            extra_controller: false,
            expenses: Vec::new(),
        }
    }

    fn day(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).unwrap()
    }

    #[test]
    fn only_confirmed_orders_hold_days_inclusively() {
        let product = Product::new("p1", "PS VR2", 60.0, 180.0, 2);
        let orders = vec![
            booking(OrderStatus::Confirmed, (3, 1), (3, 8)),
            booking(OrderStatus::Confirmed, (3, 8), (3, 15)),
            booking(OrderStatus::Pending, (3, 1), (3, 8)),
            booking(OrderStatus::Delivered, (3, 1), (3, 8)),
        ];

        let counts = booked_counts(&orders, &product);
        assert_eq!(counts.on(day(3, 1)), 1);
        assert_eq!(counts.on(day(3, 8)), 2);
        assert_eq!(counts.on(day(3, 15)), 1);
        assert_eq!(counts.on(day(3, 16)), 0);

        assert!(counts.is_fully_booked(day(3, 8)));
        assert!(!counts.is_fully_booked(day(3, 9)));
    }

    #[test]
    fn far_future_end_date_is_counted_without_walking_the_range() {
        let product = Product::new("p1", "PS VR2", 60.0, 180.0, 1);
        let mut order = booking(OrderStatus::Confirmed, (3, 1), (3, 8));
        order.rental_end_date = Some(Utc.with_ymd_and_hms(9999, 12, 31, 0, 0, 0).unwrap());

        let counts = booked_counts(&[order], &product);
        assert!(counts.is_fully_booked(NaiveDate::from_ymd_opt(5000, 6, 1).unwrap()));
        assert!(counts.is_fully_booked(day(3, 1)));
        assert_eq!(counts.on(day(2, 28)), 0);
    }

    #[test]
    fn starts_must_be_open_future_saturdays() {
        let product = Product::new("p1", "PS VR2", 60.0, 180.0, 1);
        let counts = booked_counts(&[booking(OrderStatus::Confirmed, (3, 8), (3, 14))], &product);
        let today = day(3, 3);

        assert!(!counts.is_selectable_start(day(3, 1), today)); // past
        assert!(!counts.is_selectable_start(day(3, 7), today)); // Friday
        assert!(!counts.is_selectable_start(day(3, 8), today)); // fully booked
        assert!(counts.is_selectable_start(day(3, 15), today));
    }
}
