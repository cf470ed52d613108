use std::path::PathBuf;

use tracing::{debug, warn};

use super::{AuthState, SessionError};

/// Key the session record is stored under; the file is `<dir>/luxe_auth.json`.
pub const STORAGE_KEY: &str = "luxe_auth";

/// Where the session record lives. Without a directory nothing is persisted.
#[derive(Debug, Clone, Default)]
pub struct SessionStorage {
    path: Option<PathBuf>,
}

impl SessionStorage {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(dir.into().join(format!("{}.json", STORAGE_KEY))),
        }
    }

    pub fn ephemeral() -> Self {
        Self::default()
    }

    /// Reads the stored record. A missing or unreadable record counts as no session.
    pub async fn load(&self) -> Option<AuthState> {
        let path = self.path.as_ref()?;
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read session record");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Discarding malformed session record");
                None
            }
        }
    }

    pub async fn save(&self, state: &AuthState) -> Result<(), SessionError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| SessionError::Storage(e.to_string()))?;
        }
        let bytes = serde_json::to_vec(state).map_err(|e| SessionError::Storage(e.to_string()))?;
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        debug!(path = %path.display(), "Session persisted");
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), SessionError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Storage(e.to_string())),
        }
    }
}
