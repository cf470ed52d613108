use tokio::sync::oneshot;

use crate::domain::{AddonSettings, GlobalFinancials, OverheadBucket};
use crate::settings_actor::SettingsError;
use crate::sync::{SyncError, SyncFailure, SyncJob};

/// Generic type aliases for service communication
pub type ServiceResult<T, E> = std::result::Result<T, E>;
pub type ServiceResponse<T, E> = oneshot::Sender<ServiceResult<T, E>>;

/// Requests understood by the settings service. Each variant carries its
/// parameters and a oneshot channel for the answer.
#[derive(Debug)]
pub enum SettingsRequest {
    Load {
        addons: AddonSettings,
        financials: GlobalFinancials,
        respond_to: ServiceResponse<(), SettingsError>,
    },
    GetAddons {
        respond_to: ServiceResponse<AddonSettings, SettingsError>,
    },
    ReplaceAddons {
        settings: AddonSettings,
        respond_to: ServiceResponse<AddonSettings, SettingsError>,
    },
    GetFinancials {
        respond_to: ServiceResponse<GlobalFinancials, SettingsError>,
    },
    ReplaceFinancials {
        financials: GlobalFinancials,
        respond_to: ServiceResponse<GlobalFinancials, SettingsError>,
    },
    AdjustFinancials {
        bucket: OverheadBucket,
        delta: f64,
        respond_to: ServiceResponse<GlobalFinancials, SettingsError>,
    },
}

/// Requests understood by the sync worker.
#[derive(Debug)]
pub enum SyncRequest {
    /// Fire-and-forget remote write.
    Submit { job: SyncJob },
    /// Answered once every job submitted before it has finished.
    Flush {
        respond_to: ServiceResponse<(), SyncError>,
    },
    Failures {
        respond_to: ServiceResponse<Vec<SyncFailure>, SyncError>,
    },
    ClearFailures {
        respond_to: ServiceResponse<usize, SyncError>,
    },
}
