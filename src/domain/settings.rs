use serde::{Deserialize, Serialize};

use super::order::RentalPeriod;

/// Pricing and stock of the two rental addons. A singleton record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddonSettings {
    #[serde(rename = "psPlusPriceWeek")]
    pub subscription_price_week: f64,
    #[serde(rename = "psPlusPriceMonth")]
    pub subscription_price_month: f64,
    #[serde(rename = "psPlusStock")]
    pub subscription_stock: u32,
    pub controller_price_week: f64,
    pub controller_price_month: f64,
    pub controller_stock: u32,
}

/// The two addon kinds an order can include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddonKind {
    SubscriptionExtra,
    ExtraController,
}

impl AddonSettings {
    pub fn unit_price(&self, kind: AddonKind, period: RentalPeriod) -> f64 {
        match (kind, period) {
            (AddonKind::SubscriptionExtra, RentalPeriod::Weeks) => self.subscription_price_week,
            (AddonKind::SubscriptionExtra, RentalPeriod::Months) => self.subscription_price_month,
            (AddonKind::ExtraController, RentalPeriod::Weeks) => self.controller_price_week,
            (AddonKind::ExtraController, RentalPeriod::Months) => self.controller_price_month,
        }
    }

    pub fn stock(&self, kind: AddonKind) -> u32 {
        match kind {
            AddonKind::SubscriptionExtra => self.subscription_stock,
            AddonKind::ExtraController => self.controller_stock,
        }
    }
}

/// Monthly overhead accumulators. Every bucket stays non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalFinancials {
    pub salary: f64,
    pub emi: f64,
    pub subscriptions: f64,
    pub ads: f64,
    pub other: f64,
}

/// Named overhead bucket of [`GlobalFinancials`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverheadBucket {
    Salary,
    Emi,
    Subscriptions,
    Ads,
    Other,
}

impl GlobalFinancials {
    /// Starting figures used until the store answers.
    pub fn baseline() -> Self {
        Self {
            salary: 50_000.0,
            emi: 20_000.0,
            subscriptions: 5_000.0,
            ads: 10_000.0,
            other: 0.0,
        }
    }

    pub fn total(&self) -> f64 {
        self.salary + self.emi + self.subscriptions + self.ads + self.other
    }

    fn bucket_mut(&mut self, bucket: OverheadBucket) -> &mut f64 {
        match bucket {
            OverheadBucket::Salary => &mut self.salary,
            OverheadBucket::Emi => &mut self.emi,
            OverheadBucket::Subscriptions => &mut self.subscriptions,
            OverheadBucket::Ads => &mut self.ads,
            OverheadBucket::Other => &mut self.other,
        }
    }

    pub fn bucket(&self, bucket: OverheadBucket) -> f64 {
        match bucket {
            OverheadBucket::Salary => self.salary,
            OverheadBucket::Emi => self.emi,
            OverheadBucket::Subscriptions => self.subscriptions,
            OverheadBucket::Ads => self.ads,
            OverheadBucket::Other => self.other,
        }
    }

    /// Applies a relative change, clamping the bucket at zero.
    pub fn adjust(&mut self, bucket: OverheadBucket, delta: f64) {
        let value = self.bucket_mut(bucket);
        *value = (*value + delta).max(0.0);
    }

    /// Copy with every negative or non-finite bucket forced to zero.
    pub fn clamped(self) -> Self {
        let clamp = |value: f64| if value.is_finite() { value.max(0.0) } else { 0.0 };
        Self {
            salary: clamp(self.salary),
            emi: clamp(self.emi),
            subscriptions: clamp(self.subscriptions),
            ads: clamp(self.ads),
            other: clamp(self.other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjustment_clamps_at_zero() {
        let mut financials = GlobalFinancials::baseline();
        financials.adjust(OverheadBucket::Ads, -25_000.0);
        assert_eq!(financials.ads, 0.0);

        financials.adjust(OverheadBucket::Other, 1_500.0);
        assert_eq!(financials.bucket(OverheadBucket::Other), 1_500.0);
    }

    #[test]
    fn replacement_is_clamped() {
        let financials = GlobalFinancials {
            salary: -1.0,
            emi: 10.0,
            subscriptions: f64::NAN,
            ads: 5.0,
            other: 0.0,
        }
        .clamped();
        assert_eq!(financials.total(), 15.0);
    }

    #[test]
    fn addon_settings_use_store_field_names() {
        let json = serde_json::json!({
            "psPlusPriceWeek": 500.0,
            "psPlusPriceMonth": 1500.0,
            "psPlusStock": 10,
            "controllerPriceWeek": 800.0,
            "controllerPriceMonth": 2500.0,
            "controllerStock": 5
        });
        let settings: AddonSettings = serde_json::from_value(json).unwrap();
        assert_eq!(settings.unit_price(AddonKind::ExtraController, RentalPeriod::Months), 2500.0);
        assert_eq!(settings.stock(AddonKind::SubscriptionExtra), 10);
    }
}
