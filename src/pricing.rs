//! Checkout pricing: rental plus per-period addons, and the rental end date.

use chrono::{DateTime, Days, Months, Utc};
use thiserror::Error;

use crate::domain::{AddonKind, AddonSettings, Product, RentalPeriod};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error("Invalid rental duration: {0}")]
    InvalidDuration(u32),
    #[error("{0:?} is out of stock")]
    AddonUnavailable(AddonKind),
}

/// Addons picked at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddonSelection {
    pub subscription_extra: bool,
    pub extra_controller: bool,
}

impl AddonSelection {
    fn selected(self) -> impl Iterator<Item = AddonKind> {
        [
            (self.subscription_extra, AddonKind::SubscriptionExtra),
            (self.extra_controller, AddonKind::ExtraController),
        ]
        .into_iter()
        .filter_map(|(picked, kind)| picked.then_some(kind))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub rental: f64,
    pub subscription_extra: f64,
    pub extra_controller: f64,
    pub total: f64,
}

/// Prices a rental. Every price is per period, so each line is unit price times duration.
pub fn quote(
    product: &Product,
    addons: &AddonSettings,
    duration: u32,
    period: RentalPeriod,
    selection: AddonSelection,
) -> Result<Quote, PricingError> {
    if duration < 1 {
        return Err(PricingError::InvalidDuration(duration));
    }
    let units = f64::from(duration);
    let unit_price = match period {
        RentalPeriod::Weeks => product.price_per_week,
        RentalPeriod::Months => product.price_per_month,
    };

    let mut quote = Quote {
        rental: unit_price * units,
        subscription_extra: 0.0,
        extra_controller: 0.0,
        total: 0.0,
    };
    for kind in selection.selected() {
        if addons.stock(kind) == 0 {
            return Err(PricingError::AddonUnavailable(kind));
        }
        let cost = addons.unit_price(kind, period) * units;
        match kind {
            AddonKind::SubscriptionExtra => quote.subscription_extra = cost,
            AddonKind::ExtraController => quote.extra_controller = cost,
        }
    }
    quote.total = quote.rental + quote.subscription_extra + quote.extra_controller;
    Ok(quote)
}

/// End of a rental starting at `start`: `7 * duration` days, or `duration` calendar months.
pub fn rental_end(start: DateTime<Utc>, duration: u32, period: RentalPeriod) -> Option<DateTime<Utc>> {
    match period {
        RentalPeriod::Weeks => start.checked_add_days(Days::new(7 * u64::from(duration))),
        RentalPeriod::Months => start.checked_add_months(Months::new(duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn addons() -> AddonSettings {
        AddonSettings {
            subscription_price_week: 500.0,
            subscription_price_month: 1500.0,
            subscription_stock: 10,
            controller_price_week: 800.0,
            controller_price_month: 2500.0,
            controller_stock: 0,
        }
    }

    #[test]
    fn addons_are_charged_per_period() {
        let product = Product::new("p1", "PS5", 50.0, 150.0, 5);
        let selection = AddonSelection {
            subscription_extra: true,
            extra_controller: false,
        };

        let quote = quote(&product, &addons(), 2, RentalPeriod::Months, selection).unwrap();
        assert_eq!(quote.rental, 300.0);
        assert_eq!(quote.subscription_extra, 3000.0);
        assert_eq!(quote.total, 3300.0);
    }

    #[test]
    fn addon_without_stock_cannot_be_selected() {
        let product = Product::new("p1", "PS5", 50.0, 150.0, 5);
        let selection = AddonSelection {
            subscription_extra: false,
            extra_controller: true,
        };

        assert_eq!(
            quote(&product, &addons(), 1, RentalPeriod::Weeks, selection),
            Err(PricingError::AddonUnavailable(AddonKind::ExtraController))
        );
    }

    #[test]
    fn month_rentals_end_on_calendar_months() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let end = rental_end(start, 1, RentalPeriod::Months).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());

        let end = rental_end(start, 2, RentalPeriod::Weeks).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 2, 14, 0, 0, 0).unwrap());
    }
}
