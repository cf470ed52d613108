use serde::{Deserialize, Serialize};

/// Account role. The store calls customers `user`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    #[default]
    #[serde(rename = "user")]
    Customer,
    #[serde(rename = "admin")]
    Admin,
}

impl Role {
    /// Display name used when the store returns an account without one.
    pub fn default_display_name(self) -> &'static str {
        match self {
            Role::Customer => "User",
            Role::Admin => "Admin",
        }
    }
}

/// Identity-proof review state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    #[default]
    None,
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    /// Whether a freshly attached proof should move the account back into review.
    pub fn accepts_new_proof(self) -> bool {
        matches!(self, VerificationStatus::None | VerificationStatus::Rejected)
    }
}

/// A delivery address saved on a user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedLocation {
    pub id: String,
    pub name: String,
    pub address: String,
    pub pincode: String,
    pub lat: f64,
    pub lng: f64,
}

impl SavedLocation {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        pincode: impl Into<String>,
        lat: f64,
        lng: f64,
    ) -> Self {
        Self {
            id: format!("loc-{}", uuid::Uuid::new_v4().simple()),
            name: name.into(),
            address: address.into(),
            pincode: pincode.into(),
            lat,
            lng,
        }
    }
}

/// Represents a registered account, customer or admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub saved_locations: Vec<SavedLocation>,
    #[serde(default)]
    pub id_verification_status: VerificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_proof_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_id_proof: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

impl User {
    /// Creates a customer with every optional field at its default.
    ///
    /// # Notes
    /// The `id` field is initialized as an empty string and is assigned by the store.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            email: email.into(),
            role: Role::Customer,
            age: None,
            phone: None,
            saved_locations: Vec::new(),
            id_verification_status: VerificationStatus::None,
            id_proof_url: None,
            has_id_proof: None,
            notes: None,
            is_primary: false,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True when a proof is on file, either inline or flagged by the store.
    pub fn has_id_proof_on_file(&self) -> bool {
        self.id_proof_url.as_deref().is_some_and(|url| !url.is_empty())
            || self.has_id_proof.unwrap_or(false)
    }

    /// Applies a partial update in place. Absent fields are left untouched.
    pub fn apply_patch(&mut self, patch: &UserPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(age) = patch.age {
            self.age = Some(age);
        }
        if let Some(phone) = &patch.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(locations) = &patch.saved_locations {
            self.saved_locations = locations.clone();
        }
        if let Some(status) = patch.id_verification_status {
            self.id_verification_status = status;
        }
        if let Some(url) = &patch.id_proof_url {
            self.id_proof_url = Some(url.clone());
            self.has_id_proof = Some(true);
        }
        if let Some(notes) = &patch.notes {
            self.notes = Some(notes.clone());
        }
        if let Some(is_primary) = patch.is_primary {
            self.is_primary = is_primary;
        }
    }
}

/// Partial update for a user. Serialized as the body of `PUT /users/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_locations: Option<Vec<SavedLocation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_verification_status: Option<VerificationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_proof_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_primary: Option<bool>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        *self == UserPatch::default()
    }

    pub fn verification(status: VerificationStatus) -> Self {
        Self {
            id_verification_status: Some(status),
            ..Self::default()
        }
    }

    pub fn primary(is_primary: bool) -> Self {
        Self {
            is_primary: Some(is_primary),
            ..Self::default()
        }
    }

    pub fn notes(notes: impl Into<String>) -> Self {
        Self {
            notes: Some(notes.into()),
            ..Self::default()
        }
    }
}

/// Payload for creating an account (`POST /users`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Credentials sent to `POST /users/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub role: Role,
}

/// Phone numbers are accepted when they carry 10 to 15 digits, ignoring separators.
pub fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    (10..=15).contains(&digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_validation_counts_digits_only() {
        assert!(is_valid_phone("+91 98765-43210"));
        assert!(is_valid_phone("9876543210"));
        assert!(!is_valid_phone("555-0123"));
        assert!(!is_valid_phone("1234567890123456"));
        assert!(!is_valid_phone(""));
    }

    #[test]
    fn patch_only_touches_supplied_fields() {
        let mut user = User::new("Alice", "alice@example.com");
        user.notes = Some("prefers evenings".into());

        user.apply_patch(&UserPatch {
            phone: Some("9876543210".into()),
            ..UserPatch::default()
        });

        assert_eq!(user.phone.as_deref(), Some("9876543210"));
        assert_eq!(user.notes.as_deref(), Some("prefers evenings"));
        assert_eq!(user.name, "Alice");
    }

    #[test]
    fn attaching_proof_marks_it_on_file() {
        let mut user = User::new("Bob", "bob@example.com");
        assert!(!user.has_id_proof_on_file());

        user.apply_patch(&UserPatch {
            id_proof_url: Some("data:image/png;base64,AAAA".into()),
            ..UserPatch::default()
        });

        assert!(user.has_id_proof_on_file());
    }

    #[test]
    fn role_uses_store_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Customer).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(
            serde_json::to_string(&VerificationStatus::Verified).unwrap(),
            "\"VERIFIED\""
        );
    }
}
