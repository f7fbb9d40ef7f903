/// Remote identity store client
///
/// The store owns username uniqueness. This crate can only ask whether a
/// name is free and attempt to claim it; the store decides races.
///
/// ## Endpoints
///
/// - `GET  {base}/identities/availability?username=` -> `{ "available": bool }`, 404 = available, 409 = taken
/// - `POST {base}/identities` -> created identity, 409 on conflict
/// - `GET  {base}/identities/by-owner/{owner_id}` -> identity, 404 = none
/// - `PATCH {base}/identities/by-owner/{owner_id}` -> updated identity
use crate::config::IdentityStoreSettings;
use crate::error::{OutreachError, Result};
use crate::models::{Availability, CreateIdentityRequest, EmailIdentity};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// Seam between the reservation workflow and whatever owns identities
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Side-effect free; repeated calls with unchanged remote state agree
    async fn check_availability(&self, username: &str) -> Result<Availability>;

    /// Not idempotent: a second call for the same username must conflict
    async fn create_identity(&self, request: &CreateIdentityRequest) -> Result<EmailIdentity>;

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<EmailIdentity>>;

    async fn update_display_name(&self, owner_id: Uuid, display_name: &str)
        -> Result<EmailIdentity>;
}

#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    available: bool,
}

#[derive(Debug, Deserialize)]
struct IdentityRecord {
    user_id: Uuid,
    username: String,
    #[serde(default)]
    domain: Option<String>,
    display_name: String,
    #[serde(default)]
    verified: bool,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
struct StoreErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct DisplayNamePatch<'a> {
    display_name: &'a str,
}

/// reqwest-backed [`IdentityStore`]
#[derive(Clone)]
pub struct HttpIdentityStore {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    domain: String,
}

impl HttpIdentityStore {
    pub fn new(base_url: &str, domain: &str, api_key: Option<String>, http: Client) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            domain: domain.to_string(),
        }
    }

    pub fn from_settings(settings: &IdentityStoreSettings) -> Result<Self> {
        let base_url = settings.base_url.as_deref().ok_or_else(|| {
            OutreachError::Configuration("IDENTITY_STORE_URL not configured".to_string())
        })?;
        let http = super::build_http_client(settings.request_timeout())?;
        Ok(Self::new(
            base_url,
            &settings.email_domain,
            settings.api_key.clone(),
            http,
        ))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key).header("apikey", key),
            None => builder,
        }
    }

    fn into_identity(&self, record: IdentityRecord) -> EmailIdentity {
        EmailIdentity {
            user_id: record.user_id,
            username: record.username,
            domain: record.domain.unwrap_or_else(|| self.domain.clone()),
            display_name: record.display_name,
            verified: record.verified,
            created_at: record.created_at,
        }
    }

    async fn identity_from(&self, response: Response) -> Result<EmailIdentity> {
        let record: IdentityRecord = response.json().await.map_err(|e| {
            OutreachError::Upstream(format!("Malformed identity record: {}", e))
        })?;
        Ok(self.into_identity(record))
    }
}

async fn upstream_error(operation: &str, response: Response) -> OutreachError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read response body".to_string());
    warn!(operation, status = %status, body = %body, "Identity store request failed");
    OutreachError::Upstream(format!("{} failed with status {}", operation, status))
}

async fn error_body(response: Response) -> StoreErrorBody {
    response.json().await.unwrap_or_default()
}

#[async_trait]
impl IdentityStore for HttpIdentityStore {
    async fn check_availability(&self, username: &str) -> Result<Availability> {
        let url = format!("{}/identities/availability", self.base_url);
        debug!(url = %url, username, "Checking username availability");

        let response = self
            .authorize(self.http.get(&url).query(&[("username", username)]))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(Availability::Available),
            StatusCode::CONFLICT => Ok(Availability::Taken),
            status if status.is_success() => {
                let body: AvailabilityResponse = response.json().await.map_err(|e| {
                    OutreachError::Upstream(format!("Malformed availability response: {}", e))
                })?;
                Ok(if body.available {
                    Availability::Available
                } else {
                    Availability::Taken
                })
            }
            _ => Err(upstream_error("availability check", response).await),
        }
    }

    async fn create_identity(&self, request: &CreateIdentityRequest) -> Result<EmailIdentity> {
        let url = format!("{}/identities", self.base_url);
        debug!(url = %url, username = %request.username, "Creating email identity");

        let response = self
            .authorize(self.http.post(&url).json(request))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => self.identity_from(response).await,
            StatusCode::CONFLICT => {
                let body = error_body(response).await;
                match body.code.as_deref() {
                    Some("identity_exists") => Err(OutreachError::IdentityAlreadyExists),
                    _ => Err(OutreachError::UsernameTaken),
                }
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let body = error_body(response).await;
                Err(OutreachError::Validation(
                    body.message
                        .unwrap_or_else(|| "identity rejected by store".to_string()),
                ))
            }
            _ => Err(upstream_error("identity creation", response).await),
        }
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<EmailIdentity>> {
        let url = format!("{}/identities/by-owner/{}", self.base_url, owner_id);

        let response = self.authorize(self.http.get(&url)).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => self.identity_from(response).await.map(Some),
            _ => Err(upstream_error("identity lookup", response).await),
        }
    }

    async fn update_display_name(
        &self,
        owner_id: Uuid,
        display_name: &str,
    ) -> Result<EmailIdentity> {
        let url = format!("{}/identities/by-owner/{}", self.base_url, owner_id);

        let response = self
            .authorize(self.http.patch(&url).json(&DisplayNamePatch { display_name }))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(OutreachError::IdentityRequired),
            status if status.is_success() => self.identity_from(response).await,
            _ => Err(upstream_error("display name update", response).await),
        }
    }
}
