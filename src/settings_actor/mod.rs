//! Singleton settings: addon pricing/stock and the monthly overhead buckets.

pub mod error;

pub use error::*;

use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::clients::SettingsClient;
use crate::domain::{AddonSettings, GlobalFinancials, OverheadBucket};
use crate::messages::{ServiceResponse, SettingsRequest};

fn validate_addons(settings: &AddonSettings) -> Result<(), SettingsError> {
    let prices = [
        ("subscription weekly price", settings.subscription_price_week),
        ("subscription monthly price", settings.subscription_price_month),
        ("controller weekly price", settings.controller_price_week),
        ("controller monthly price", settings.controller_price_month),
    ];
    for (name, price) in prices {
        if !price.is_finite() || price < 0.0 {
            return Err(SettingsError::InvalidSetting(format!("{} must be non-negative, got {}", name, price)));
        }
    }
    Ok(())
}

/// Owns the two singleton records. Financial buckets never go below zero.
pub struct SettingsService {
    receiver: mpsc::Receiver<SettingsRequest>,
    addons: AddonSettings,
    financials: GlobalFinancials,
}

impl SettingsService {
    pub fn new(buffer_size: usize) -> (Self, SettingsClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self {
            receiver,
            addons: AddonSettings::default(),
            financials: GlobalFinancials::baseline(),
        };
        (service, SettingsClient::new(sender))
    }

    #[instrument(name = "settings_service", skip(self))]
    pub async fn run(mut self) {
        info!("SettingsService starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                SettingsRequest::Load { addons, financials, respond_to } => {
                    self.handle_load(addons, financials, respond_to);
                }
                SettingsRequest::GetAddons { respond_to } => {
                    let _ = respond_to.send(Ok(self.addons));
                }
                SettingsRequest::ReplaceAddons { settings, respond_to } => {
                    self.handle_replace_addons(settings, respond_to);
                }
                SettingsRequest::GetFinancials { respond_to } => {
                    let _ = respond_to.send(Ok(self.financials));
                }
                SettingsRequest::ReplaceFinancials { financials, respond_to } => {
                    self.financials = financials.clamped();
                    info!(total = self.financials.total(), "Financials replaced");
                    let _ = respond_to.send(Ok(self.financials));
                }
                SettingsRequest::AdjustFinancials { bucket, delta, respond_to } => {
                    self.handle_adjust(bucket, delta, respond_to);
                }
            }
        }

        info!("SettingsService stopped");
    }

    fn handle_load(
        &mut self,
        addons: AddonSettings,
        financials: GlobalFinancials,
        respond_to: ServiceResponse<(), SettingsError>,
    ) {
        debug!("Loading settings from store");
        if let Err(e) = validate_addons(&addons) {
            warn!(error = %e, "Ignoring invalid addon settings from store");
        } else {
            self.addons = addons;
        }
        self.financials = financials.clamped();
        let _ = respond_to.send(Ok(()));
    }

    #[instrument(skip(self, respond_to))]
    fn handle_replace_addons(
        &mut self,
        settings: AddonSettings,
        respond_to: ServiceResponse<AddonSettings, SettingsError>,
    ) {
        let result = validate_addons(&settings).map(|()| {
            self.addons = settings;
            info!("Addon settings replaced");
            self.addons
        });
        let _ = respond_to.send(result);
    }

    #[instrument(skip(self, respond_to))]
    fn handle_adjust(
        &mut self,
        bucket: OverheadBucket,
        delta: f64,
        respond_to: ServiceResponse<GlobalFinancials, SettingsError>,
    ) {
        let result = if delta.is_finite() {
            self.financials.adjust(bucket, delta);
            debug!(value = self.financials.bucket(bucket), "Bucket adjusted");
            Ok(self.financials)
        } else {
            Err(SettingsError::InvalidAdjustment(delta))
        };
        let _ = respond_to.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_adjustments_never_go_negative() {
        let (service, client) = SettingsService::new(10);
        tokio::spawn(service.run());

        let financials = client.adjust_financials(OverheadBucket::Emi, -50_000.0).await.unwrap();
        assert_eq!(financials.emi, 0.0);

        let financials = client.adjust_financials(OverheadBucket::Emi, 1_200.0).await.unwrap();
        assert_eq!(financials.emi, 1_200.0);
        assert_eq!(client.get_financials().await.unwrap(), financials);

        assert_eq!(
            client.adjust_financials(OverheadBucket::Ads, f64::INFINITY).await,
            Err(SettingsError::InvalidAdjustment(f64::INFINITY))
        );
    }

    #[tokio::test]
    async fn test_negative_addon_price_is_refused() {
        let (service, client) = SettingsService::new(10);
        tokio::spawn(service.run());

        let mut settings = AddonSettings::default();
        settings.controller_price_week = -1.0;

        assert!(client.replace_addons(settings).await.is_err());
        assert_eq!(client.get_addons().await.unwrap(), AddonSettings::default());
    }

    #[tokio::test]
    async fn test_load_clamps_store_financials() {
        let (service, client) = SettingsService::new(10);
        tokio::spawn(service.run());

        let financials = GlobalFinancials {
            salary: -10.0,
            ..GlobalFinancials::baseline()
        };
        client.load(AddonSettings::default(), financials).await.unwrap();
        assert_eq!(client.get_financials().await.unwrap().salary, 0.0);
    }
}
