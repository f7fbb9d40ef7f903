use chrono::{DateTime, Utc};
use lettre::message::Mailbox;
use lettre::Address;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Permanent sending identity owned by exactly one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailIdentity {
    pub user_id: Uuid,
    /// Unique across the system and immutable once created
    pub username: String,
    pub domain: String,
    pub display_name: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl EmailIdentity {
    /// Canonical sending address (`username@domain`)
    pub fn address(&self) -> String {
        format!("{}@{}", self.username, self.domain)
    }

    /// RFC 5322 mailbox with display name, e.g. `Jake Davids <jakedavids@example.com>`
    ///
    /// The name is quoted and escaped by lettre. Control characters are dropped
    /// since they cannot be carried in a header.
    pub fn mailbox(&self) -> String {
        let Ok(address) = Address::new(&self.username, &self.domain) else {
            return self.address();
        };
        let name: String = self
            .display_name
            .chars()
            .filter(|c| !c.is_control())
            .collect();
        Mailbox::new(Some(name), address).to_string()
    }
}

/// Payload submitted to the identity-creation endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateIdentityRequest {
    #[validate(
        length(min = 3, max = 64),
        custom(function = "crate::validators::validate_username_shape_validator")
    )]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub display_name: String,
    pub owner_id: Uuid,
}

/// Answer from the availability endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Taken,
}

/// Caller-facing result of an availability check on a well-formed username.
///
/// Exactly one state is reported per check; remote failures land in
/// `Error` and are never folded into `Taken`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Available,
    Taken,
    Error { reason: String },
}

impl AvailabilityStatus {
    /// Whether the create action may be offered
    pub fn allows_create(&self) -> bool {
        matches!(self, AvailabilityStatus::Available)
    }
}

impl From<Availability> for AvailabilityStatus {
    fn from(value: Availability) -> Self {
        match value {
            Availability::Available => AvailabilityStatus::Available,
            Availability::Taken => AvailabilityStatus::Taken,
        }
    }
}
