/// Identity reservation workflow
///
/// 1. Validate the candidate username locally (no remote call on failure)
/// 2. Ask the identity store whether it is free
/// 3. On confirmation, claim it for the session's user
///
/// Creation is never retried: the store's 409 after a successful check means
/// someone else won the race, and the caller must pick another name.
use crate::error::{OutreachError, Result};
use crate::models::{
    Availability, AvailabilityStatus, CreateIdentityRequest, EmailIdentity, Session,
};
use crate::services::IdentityStore;
use crate::validators::{check_username, normalize_display_name};
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

#[derive(Clone)]
pub struct ReservationService {
    store: Arc<dyn IdentityStore>,
}

impl ReservationService {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Check a candidate username.
    ///
    /// Malformed names fail with a validation error before any remote call.
    /// Remote failures come back as `Err`, distinct from `Availability::Taken`.
    pub async fn check_availability(&self, username: &str) -> Result<Availability> {
        check_username(username)?;
        self.store.check_availability(username).await
    }

    /// Availability check folded into the tri-state a composer displays.
    ///
    /// Only local validation errors are returned as `Err`.
    pub async fn availability_status(&self, username: &str) -> Result<AvailabilityStatus> {
        match self.check_availability(username).await {
            Ok(availability) => Ok(availability.into()),
            Err(err) if err.is_validation() => Err(err),
            Err(err) => {
                warn!(username, error = %err, "Username availability check failed");
                Ok(AvailabilityStatus::Error {
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Current identity of the session's user.
    ///
    /// A failed lookup is an error, never "no identity yet".
    pub async fn find_identity(&self, session: &Session) -> Result<Option<EmailIdentity>> {
        self.store.find_by_owner(session.user_id).await
    }

    /// Whether the create action may be offered to this user
    pub async fn can_create(&self, session: &Session) -> Result<bool> {
        Ok(self.find_identity(session).await?.is_none())
    }

    /// Claim `username` permanently for the session's user
    pub async fn reserve(
        &self,
        session: &Session,
        username: &str,
        display_name: &str,
    ) -> Result<EmailIdentity> {
        check_username(username)?;
        let display_name = normalize_display_name(display_name)?;

        let request = CreateIdentityRequest {
            username: username.to_string(),
            display_name,
            owner_id: session.user_id,
        };
        request.validate()?;

        if self.find_identity(session).await?.is_some() {
            return Err(OutreachError::IdentityAlreadyExists);
        }

        match self.store.create_identity(&request).await {
            Ok(identity) => {
                info!(
                    user_id = %session.user_id,
                    address = %identity.address(),
                    "Email identity reserved"
                );
                Ok(identity)
            }
            Err(OutreachError::UsernameTaken) => {
                warn!(
                    user_id = %session.user_id,
                    username,
                    "Username claimed by another user between check and create"
                );
                Err(OutreachError::UsernameTaken)
            }
            Err(err) => Err(err),
        }
    }

    /// Change the display name; the username itself can never be edited
    pub async fn update_display_name(
        &self,
        session: &Session,
        display_name: &str,
    ) -> Result<EmailIdentity> {
        let display_name = normalize_display_name(display_name)?;
        let identity = self
            .store
            .update_display_name(session.user_id, &display_name)
            .await?;
        info!(user_id = %session.user_id, "Identity display name updated");
        Ok(identity)
    }
}
