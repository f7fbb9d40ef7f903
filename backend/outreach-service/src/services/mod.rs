/// Service layer for outreach-service
///
/// Provides the two workflows and their integrations:
/// - Identity reservation (username check + permanent identity creation)
/// - Bulk outreach (per-recipient send with failure isolation)
/// - Remote identity / contact stores (HTTP)
/// - Mail transports (HTTP messages API, SMTP, no-op)
/// - School directory, template rendering, retry policy
pub mod contact_store;
pub mod identity_store;
pub mod memory;
pub mod outreach;
pub mod reservation;
pub mod retry;
pub mod schools;
pub mod template;
pub mod transport;

pub use contact_store::{ContactStore, HttpContactStore};
pub use identity_store::{HttpIdentityStore, IdentityStore};
pub use memory::{MemoryContactStore, MemoryIdentityStore, MemoryTransport};
pub use outreach::OutreachService;
pub use reservation::ReservationService;
pub use retry::RetryConfig;
pub use schools::SchoolDirectory;
pub use transport::{build_transport, MessageTransport, NoopTransport};

use crate::error::{OutreachError, Result};
use std::time::Duration;

/// Shared reqwest client construction; no timeout unless configured
pub(crate) fn build_http_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let builder = reqwest::Client::builder();
    let builder = match timeout {
        Some(timeout) => builder.timeout(timeout),
        None => builder,
    };
    builder
        .build()
        .map_err(|e| OutreachError::Configuration(format!("Failed to build HTTP client: {}", e)))
}
