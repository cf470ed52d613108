use crate::domain::{OrderExpense, OrderStatus, Transition};

/// Lifecycle operations on a cached order.
#[derive(Debug, Clone)]
pub enum OrderAction {
    /// Moves the order one step along the fulfillment chain.
    Advance(Transition),
    /// Appends an expense item.
    AddExpense(OrderExpense),
    /// Removes an expense item by id.
    RemoveExpense(String),
}

/// Results from OrderActions - variants match 1:1 with OrderAction
#[derive(Debug, Clone, PartialEq)]
pub enum OrderActionResult {
    Advance { from: OrderStatus, to: OrderStatus },
    /// Full expense list after the change, ready to be persisted wholesale.
    AddExpense(Vec<OrderExpense>),
    RemoveExpense(Vec<OrderExpense>),
}
