/// Coach contact store client
///
/// Contacts belong to the athlete who added them. The bulk-send workflow
/// reads the selected contacts once, then patches the status of each
/// recipient whose send succeeded.
use crate::config::ContactStoreSettings;
use crate::error::{OutreachError, Result};
use crate::models::{CoachContact, ResponseStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Fetch the owner's contacts among `ids`; unknown ids are simply absent
    async fn get_contacts(&self, owner_id: Uuid, ids: &[Uuid]) -> Result<Vec<CoachContact>>;

    /// Record a status transition for a single contact
    async fn update_status(
        &self,
        contact_id: Uuid,
        status: ResponseStatus,
        date_contacted: DateTime<Utc>,
    ) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct StatusPatch {
    response_status: ResponseStatus,
    date_contacted: DateTime<Utc>,
}

/// reqwest-backed [`ContactStore`]
#[derive(Clone)]
pub struct HttpContactStore {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpContactStore {
    pub fn new(base_url: &str, api_key: Option<String>, http: Client) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn from_settings(settings: &ContactStoreSettings) -> Result<Self> {
        let base_url = settings.base_url.as_deref().ok_or_else(|| {
            OutreachError::Configuration("CONTACT_STORE_URL not configured".to_string())
        })?;
        let http = super::build_http_client(settings.request_timeout())?;
        Ok(Self::new(base_url, settings.api_key.clone(), http))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key).header("apikey", key),
            None => builder,
        }
    }
}

#[async_trait]
impl ContactStore for HttpContactStore {
    async fn get_contacts(&self, owner_id: Uuid, ids: &[Uuid]) -> Result<Vec<CoachContact>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/contacts", self.base_url);
        let id_list = ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        debug!(url = %url, owner_id = %owner_id, count = ids.len(), "Fetching coach contacts");

        let response = self
            .authorize(
                self.http
                    .get(&url)
                    .query(&[("owner_id", owner_id.to_string()), ("ids", id_list)]),
            )
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Contact fetch failed");
            return Err(OutreachError::Upstream(format!(
                "contact fetch failed with status {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| OutreachError::Upstream(format!("Malformed contact list: {}", e)))
    }

    async fn update_status(
        &self,
        contact_id: Uuid,
        status: ResponseStatus,
        date_contacted: DateTime<Utc>,
    ) -> Result<()> {
        let url = format!("{}/contacts/{}", self.base_url, contact_id);

        let response = self
            .authorize(self.http.patch(&url).json(&StatusPatch {
                response_status: status,
                date_contacted,
            }))
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(OutreachError::InvalidRecipient(format!(
                "contact {} not found",
                contact_id
            ))),
            s => Err(OutreachError::Upstream(format!(
                "contact status update failed with status {}",
                s
            ))),
        }
    }
}
