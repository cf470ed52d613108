use crate::actor_framework::Entity;
use crate::domain::{Order, OrderExpense, OrderPatch, OrderStatus, Transition};
use super::actions::{OrderAction, OrderActionResult};
use super::error::OrderError;

fn validate_expense(expense: &OrderExpense) -> Result<(), OrderError> {
    if expense.label.trim().is_empty() {
        return Err(OrderError::InvalidExpense("label must not be empty".to_string()));
    }
    if !expense.amount.is_finite() || expense.amount <= 0.0 {
        return Err(OrderError::InvalidExpense(format!(
            "amount must be positive, got {}",
            expense.amount
        )));
    }
    Ok(())
}

impl Order {
    /// Applies a transition if, and only if, the order sits in its source status.
    fn advance(&mut self, transition: Transition) -> Result<(OrderStatus, OrderStatus), OrderError> {
        let from = self.status;
        let to = transition.to_status();
        if from != transition.from_status() {
            return Err(OrderError::InvalidTransition { from, to });
        }
        self.status = to;
        Ok((from, to))
    }
}

impl Entity for Order {
    type Patch = OrderPatch;
    type Action = OrderAction;
    type ActionResult = OrderActionResult;
    type Error = OrderError;

    const KIND: &'static str = "Order";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    /// Applies a partial patch with the same rules as the dedicated actions:
    /// a status must be the single legal next step, expenses must all be valid.
    fn on_update(&mut self, patch: OrderPatch) -> Result<(), OrderError> {
        if let Some(expenses) = &patch.expenses {
            expenses.iter().try_for_each(validate_expense)?;
        }
        if let Some(status) = patch.status {
            if status != self.status {
                let transition = Transition::into_status(status).ok_or(OrderError::InvalidTransition {
                    from: self.status,
                    to: status,
                })?;
                self.advance(transition)?;
            }
        }
        if let Some(expenses) = patch.expenses {
            self.expenses = expenses;
        }
        Ok(())
    }

    /// Handles order lifecycle actions.
    ///
    /// # Errors
    /// - `InvalidTransition` when the order is not in the transition's source status
    /// - `InvalidExpense` for a blank label or a non-positive amount
    /// - `ExpenseNotFound` when removing an unknown expense
    fn handle_action(&mut self, action: OrderAction) -> Result<OrderActionResult, OrderError> {
        match action {
            OrderAction::Advance(transition) => {
                let (from, to) = self.advance(transition)?;
                Ok(OrderActionResult::Advance { from, to })
            }
            OrderAction::AddExpense(expense) => {
                validate_expense(&expense)?;
                self.expenses.push(expense);
                Ok(OrderActionResult::AddExpense(self.expenses.clone()))
            }
            OrderAction::RemoveExpense(expense_id) => {
                let index = self
                    .expenses
                    .iter()
                    .position(|expense| expense.id == expense_id)
                    .ok_or(OrderError::ExpenseNotFound(expense_id))?;
                self.expenses.remove(index);
                Ok(OrderActionResult::RemoveExpense(self.expenses.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RentalPeriod, SavedLocation};
    use chrono::Utc;

    fn pending_order() -> Order {
        Order {
            id: "o1".into(),
            user_id: "u1".into(),
            product_id: "p1".into(),
            product_name: "PlayStation 5".into(),
            product_image: String::new(),
            duration: 2,
            period: RentalPeriod::Weeks,
            total_price: 100.0,
            status: OrderStatus::Pending,
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
    fn skipping_a_step_is_rejected() {
        let mut order = pending_order();
        let result = order.handle_action(OrderAction::Advance(Transition::MarkDelivered));

        assert_eq!(
            result,
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Delivered
            })
        );
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn completed_orders_cannot_move() {
        let mut order = pending_order();
        for transition in [
            Transition::Approve,
            Transition::MarkDelivered,
            Transition::MarkReturned,
            Transition::Settle,
        ] {
            order.handle_action(OrderAction::Advance(transition)).unwrap();
        }
        assert_eq!(order.status, OrderStatus::Completed);
        assert!(order.handle_action(OrderAction::Advance(Transition::Approve)).is_err());
        assert!(order.on_update(OrderPatch::status(OrderStatus::Pending)).is_err());
    }

    #[test]
    fn expense_list_tracks_adds_and_removals() {
        let mut order = pending_order();
        let shipping = OrderExpense::new("Shipping", 10.0);
        let shipping_id = shipping.id.clone();

        order.handle_action(OrderAction::AddExpense(shipping)).unwrap();
        order
            .handle_action(OrderAction::AddExpense(OrderExpense::new("Cleaning", 2.5)))
            .unwrap();
        assert_eq!(order.expenses_total(), 12.5);

        let result = order.handle_action(OrderAction::RemoveExpense(shipping_id)).unwrap();
        match result {
            OrderActionResult::RemoveExpense(remaining) => assert_eq!(remaining.len(), 1),
            other => panic!("Unexpected result: {:?}", other),
        }
        assert_eq!(order.expenses_total(), 2.5);
    }

    #[test]
    fn bad_expenses_are_refused() {
        let mut order = pending_order();
        assert!(order.handle_action(OrderAction::AddExpense(OrderExpense::new(" ", 5.0))).is_err());
        assert!(order.handle_action(OrderAction::AddExpense(OrderExpense::new("Fuel", 0.0))).is_err());
        assert!(order.expenses.is_empty());
    }
}
