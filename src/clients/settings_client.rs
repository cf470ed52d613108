use tokio::sync::mpsc;

use crate::domain::{AddonSettings, GlobalFinancials, OverheadBucket};
use crate::messages::SettingsRequest;
use crate::settings_actor::SettingsError;

/// Client for the settings service.
#[derive(Clone)]
pub struct SettingsClient {
    sender: mpsc::Sender<SettingsRequest>,
}

impl SettingsClient {
    pub fn new(sender: mpsc::Sender<SettingsRequest>) -> Self {
        Self { sender }
    }
}

client_method!(SettingsClient => fn load(addons: AddonSettings, financials: GlobalFinancials) -> () as SettingsRequest::Load, Error = SettingsError);
client_method!(SettingsClient => fn get_addons() -> AddonSettings as SettingsRequest::GetAddons, Error = SettingsError);
client_method!(SettingsClient => fn replace_addons(settings: AddonSettings) -> AddonSettings as SettingsRequest::ReplaceAddons, Error = SettingsError);
client_method!(SettingsClient => fn get_financials() -> GlobalFinancials as SettingsRequest::GetFinancials, Error = SettingsError);
client_method!(SettingsClient => fn replace_financials(financials: GlobalFinancials) -> GlobalFinancials as SettingsRequest::ReplaceFinancials, Error = SettingsError);
client_method!(SettingsClient => fn adjust_financials(bucket: OverheadBucket, delta: f64) -> GlobalFinancials as SettingsRequest::AdjustFinancials, Error = SettingsError);
