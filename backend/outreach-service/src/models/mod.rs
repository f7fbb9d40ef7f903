/// Data models for outreach-service
pub mod contact;
pub mod identity;
pub mod outreach;
pub mod session;

pub use contact::{CoachContact, ResponseStatus};
pub use identity::{Availability, AvailabilityStatus, CreateIdentityRequest, EmailIdentity};
pub use outreach::{BulkSendReport, OutboundMessage, OutreachDraft, RecipientOutcome, SendReceipt};
pub use session::Session;
