use crate::actor_framework::Entity;
use crate::domain::{User, UserPatch};
use super::error::UserError;

/// Checks a patch before it is applied anywhere, cache or session.
///
/// # Errors
/// Rejects a blank display name and a location list containing duplicate ids.
pub fn validate_patch(patch: &UserPatch) -> Result<(), UserError> {
    if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(UserError::ValidationError("Name must not be empty".to_string()));
    }
    if let Some(locations) = &patch.saved_locations {
        let mut ids: Vec<&str> = locations.iter().map(|l| l.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != locations.len() {
            return Err(UserError::ValidationError("Duplicate saved location".to_string()));
        }
    }
    Ok(())
}

impl Entity for User {
    type Patch = UserPatch;
    type Action = ();
    type ActionResult = ();
    type Error = UserError;

    const KIND: &'static str = "User";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    /// Applies a profile or admin update after [`validate_patch`].
    fn on_update(&mut self, patch: UserPatch) -> Result<(), UserError> {
        validate_patch(&patch)?;
        self.apply_patch(&patch);
        Ok(())
    }

    /// No custom actions are defined for users.
    fn handle_action(&mut self, _action: ()) -> Result<(), UserError> {
        Ok(())
    }
}
