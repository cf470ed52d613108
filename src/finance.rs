//! Financial summary, recomputed from the current orders and overheads on every read.

use serde::Serialize;

use crate::domain::{GlobalFinancials, Order};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    /// Sum of `total_price` over confirmed, delivered, returned and completed orders.
    pub revenue: f64,
    /// Every order's expenses, whatever its status.
    pub direct_expenses: f64,
    pub overheads: f64,
    pub net_profit: f64,
    pub revenue_orders: usize,
}

pub fn summarize(orders: &[Order], financials: &GlobalFinancials) -> FinancialSummary {
    let earning = orders.iter().filter(|order| order.status.counts_as_revenue());
    let revenue: f64 = earning.clone().map(|order| order.total_price).sum();
    let direct_expenses: f64 = orders.iter().map(Order::expenses_total).sum();
    let overheads = financials.total();

    FinancialSummary {
        revenue,
        direct_expenses,
        overheads,
        net_profit: revenue - direct_expenses - overheads,
        revenue_orders: earning.count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderExpense, OrderStatus, RentalPeriod, SavedLocation};
    use chrono::Utc;

    fn order(id: &str, status: OrderStatus, total_price: f64) -> Order {
        Order {
            id: id.into(),
            user_id: "u1".into(),
            product_id: "p1".into(),
            product_name: "PS5".into(),
            product_image: String::new(),
            duration: 1,
            period: RentalPeriod::Weeks,
            total_price,
            status,
            delivery_location: SavedLocation::new("Home", "1 Main St", "10001", 0.0, 0.0),
            created_at: Utc::now(),
            rental_start_date: None,
            rental_end_date: None,
            subscription_extra: false,
            extra_controller: false,
            expenses: Vec::new(),
        }
    }

    #[test]
    fn pending_orders_earn_nothing_but_their_expenses_count() {
        let mut pending = order("o1", OrderStatus::Pending, 100.0);
        pending.expenses.push(OrderExpense::new("Shipping", 10.0));
        let orders = vec![
            pending,
            order("o2", OrderStatus::Confirmed, 100.0),
            order("o3", OrderStatus::Completed, 50.0),
            order("o4", OrderStatus::Rejected, 999.0),
        ];

        let summary = summarize(&orders, &GlobalFinancials::default());
        assert_eq!(summary.revenue, 150.0);
        assert_eq!(summary.revenue_orders, 2);
        assert_eq!(summary.direct_expenses, 10.0);
        assert_eq!(summary.net_profit, 140.0);
    }

    #[test]
    fn overheads_reduce_net_profit() {
        let orders = vec![order("o1", OrderStatus::Delivered, 100_000.0)];
        let summary = summarize(&orders, &GlobalFinancials::baseline());
        assert_eq!(summary.overheads, 85_000.0);
        assert_eq!(summary.net_profit, 15_000.0);
    }
}
