/// In-memory collaborators
///
/// Used when remote stores are not configured (local development) and by
/// tests. Each store keeps every mutation under a single lock, so the
/// check-and-insert in `create_identity` is atomic the same way a unique
/// index makes it atomic in the remote store.
use crate::error::{OutreachError, Result};
use crate::models::{
    Availability, CoachContact, CreateIdentityRequest, EmailIdentity, OutboundMessage,
    ResponseStatus, SendReceipt,
};
use crate::services::{ContactStore, IdentityStore, MessageTransport};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

#[derive(Default)]
struct IdentityTables {
    by_username: HashMap<String, EmailIdentity>,
    owner_index: HashMap<Uuid, String>,
}

/// Identity store backed by a pair of maps
pub struct MemoryIdentityStore {
    domain: String,
    tables: Mutex<IdentityTables>,
    calls: AtomicUsize,
    offline: AtomicBool,
}

impl MemoryIdentityStore {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            tables: Mutex::new(IdentityTables::default()),
            calls: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
        }
    }

    /// Pre-register a username owned by someone else
    pub async fn seed(&self, owner_id: Uuid, username: &str, display_name: &str) {
        let identity = EmailIdentity {
            user_id: owner_id,
            username: username.to_string(),
            domain: self.domain.clone(),
            display_name: display_name.to_string(),
            verified: true,
            created_at: Some(Utc::now()),
        };
        let mut tables = self.tables.lock().await;
        tables.owner_index.insert(owner_id, username.to_string());
        tables.by_username.insert(username.to_string(), identity);
    }

    /// Simulate an outage; every call fails with an upstream error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of remote-equivalent calls served so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(OutreachError::Upstream(
                "identity store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn check_availability(&self, username: &str) -> Result<Availability> {
        self.enter()?;
        let tables = self.tables.lock().await;
        Ok(if tables.by_username.contains_key(username) {
            Availability::Taken
        } else {
            Availability::Available
        })
    }

    async fn create_identity(&self, request: &CreateIdentityRequest) -> Result<EmailIdentity> {
        self.enter()?;
        let mut tables = self.tables.lock().await;
        if tables.owner_index.contains_key(&request.owner_id) {
            return Err(OutreachError::IdentityAlreadyExists);
        }
        if tables.by_username.contains_key(&request.username) {
            return Err(OutreachError::UsernameTaken);
        }

        let identity = EmailIdentity {
            user_id: request.owner_id,
            username: request.username.clone(),
            domain: self.domain.clone(),
            display_name: request.display_name.clone(),
            verified: true,
            created_at: Some(Utc::now()),
        };
        tables
            .owner_index
            .insert(request.owner_id, request.username.clone());
        tables
            .by_username
            .insert(request.username.clone(), identity.clone());
        Ok(identity)
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<EmailIdentity>> {
        self.enter()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .owner_index
            .get(&owner_id)
            .and_then(|username| tables.by_username.get(username))
            .cloned())
    }

    async fn update_display_name(
        &self,
        owner_id: Uuid,
        display_name: &str,
    ) -> Result<EmailIdentity> {
        self.enter()?;
        let mut tables = self.tables.lock().await;
        let username = tables
            .owner_index
            .get(&owner_id)
            .cloned()
            .ok_or(OutreachError::IdentityRequired)?;
        let identity = tables
            .by_username
            .get_mut(&username)
            .ok_or(OutreachError::IdentityRequired)?;
        identity.display_name = display_name.to_string();
        Ok(identity.clone())
    }
}

#[derive(Default)]
struct ContactTables {
    contacts: HashMap<Uuid, (Uuid, CoachContact)>,
    failing_updates: HashSet<Uuid>,
}

/// Seed file entry: a contact plus the user who owns it
#[derive(Debug, Deserialize)]
struct SeedContact {
    owner_id: Uuid,
    #[serde(flatten)]
    contact: CoachContact,
}

/// Contact store keyed by contact id, remembering each contact's owner
#[derive(Default)]
pub struct MemoryContactStore {
    tables: Mutex<ContactTables>,
    fetches: AtomicUsize,
}

impl MemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a JSON array of contacts, each carrying its `owner_id`
    pub fn from_seed_json(raw: &str) -> Result<Self> {
        let seed: Vec<SeedContact> = serde_json::from_str(raw).map_err(|e| {
            OutreachError::Configuration(format!("Invalid contact seed file: {}", e))
        })?;
        let contacts = seed
            .into_iter()
            .map(|s| (s.contact.id, (s.owner_id, s.contact)))
            .collect();
        Ok(Self {
            tables: Mutex::new(ContactTables {
                contacts,
                failing_updates: HashSet::new(),
            }),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn load_seed(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            OutreachError::Configuration(format!(
                "Failed to read contact seed file {}: {}",
                path.display(),
                e
            ))
        })?;
        let store = Self::from_seed_json(&raw)?;
        info!(path = %path.display(), "Seeded in-memory contact store");
        Ok(store)
    }

    pub async fn insert(&self, owner_id: Uuid, contact: CoachContact) {
        self.tables
            .lock()
            .await
            .contacts
            .insert(contact.id, (owner_id, contact));
    }

    pub async fn contact(&self, id: Uuid) -> Option<CoachContact> {
        self.tables
            .lock()
            .await
            .contacts
            .get(&id)
            .map(|(_, c)| c.clone())
    }

    /// Make status updates for `id` fail with an upstream error
    pub async fn fail_updates_for(&self, id: Uuid) {
        self.tables.lock().await.failing_updates.insert(id);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContactStore for MemoryContactStore {
    async fn get_contacts(&self, owner_id: Uuid, ids: &[Uuid]) -> Result<Vec<CoachContact>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.contacts.get(id))
            .filter(|(owner, _)| *owner == owner_id)
            .map(|(_, contact)| contact.clone())
            .collect())
    }

    async fn update_status(
        &self,
        contact_id: Uuid,
        status: ResponseStatus,
        date_contacted: DateTime<Utc>,
    ) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables.failing_updates.contains(&contact_id) {
            return Err(OutreachError::Upstream(
                "contact status update failed".to_string(),
            ));
        }
        let (_, contact) = tables.contacts.get_mut(&contact_id).ok_or_else(|| {
            OutreachError::InvalidRecipient(format!("contact {} not found", contact_id))
        })?;
        contact.response_status = status;
        contact.date_contacted = Some(date_contacted);
        Ok(())
    }
}

#[derive(Default)]
struct TransportState {
    sent: Vec<OutboundMessage>,
    attempts: HashMap<String, u32>,
    failing: HashMap<String, Option<u32>>,
}

/// Transport that records delivered messages and fails on demand
#[derive(Default)]
pub struct MemoryTransport {
    state: Mutex<TransportState>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send to `address` fails
    pub async fn fail_for(&self, address: &str) {
        self.state
            .lock()
            .await
            .failing
            .insert(address.to_string(), None);
    }

    /// The first `times` sends to `address` fail, later ones succeed
    pub async fn fail_times(&self, address: &str, times: u32) {
        self.state
            .lock()
            .await
            .failing
            .insert(address.to_string(), Some(times));
    }

    pub async fn sent(&self) -> Vec<OutboundMessage> {
        self.state.lock().await.sent.clone()
    }

    /// Send attempts (successful or not) made for `address`
    pub async fn attempts(&self, address: &str) -> u32 {
        self.state
            .lock()
            .await
            .attempts
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    pub async fn total_attempts(&self) -> u32 {
        self.state.lock().await.attempts.values().sum()
    }
}

#[async_trait]
impl MessageTransport for MemoryTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt> {
        let mut state = self.state.lock().await;
        let attempt = {
            let counter = state.attempts.entry(message.to.clone()).or_insert(0);
            *counter += 1;
            *counter
        };

        let fails = match state.failing.get(&message.to) {
            Some(None) => true,
            Some(Some(times)) => attempt <= *times,
            None => false,
        };
        if fails {
            return Err(OutreachError::Transport(format!(
                "delivery to {} rejected",
                message.to
            )));
        }

        state.sent.push(message.clone());
        Ok(SendReceipt {
            message_id: Some(format!("mem-{}", state.sent.len())),
        })
    }
}
