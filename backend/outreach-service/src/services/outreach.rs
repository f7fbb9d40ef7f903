/// Bulk outreach workflow
///
/// Sends the same draft, rendered per coach, to every selected contact.
/// Each recipient is handled independently: a failed send leaves that
/// contact untouched and is counted, and the batch carries on.
///
/// With `max_concurrency == 1` (default) recipients are processed strictly
/// one after another. Higher values fan out with `buffer_unordered`; the
/// report is aggregated from outcomes as they complete, so it does not
/// depend on completion order.
use crate::config::OutreachSettings;
use crate::error::{OutreachError, Result};
use crate::models::{
    BulkSendReport, CoachContact, EmailIdentity, OutboundMessage, OutreachDraft,
    RecipientOutcome, ResponseStatus, Session,
};
use crate::services::retry::{with_retry, RetryConfig};
use crate::services::template::{html_alternative, render, RenderContext};
use crate::services::{ContactStore, IdentityStore, MessageTransport, SchoolDirectory};
use crate::validators::{check_draft_fields, validate_email};
use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Tunables for [`OutreachService`]
#[derive(Debug, Clone)]
pub struct OutreachOptions {
    pub max_concurrency: usize,
    pub retry: RetryConfig,
    pub contacted_status: ResponseStatus,
}

impl Default for OutreachOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            retry: RetryConfig::disabled(),
            contacted_status: ResponseStatus::Contacted,
        }
    }
}

impl From<&OutreachSettings> for OutreachOptions {
    fn from(settings: &OutreachSettings) -> Self {
        Self {
            max_concurrency: settings.max_concurrency.max(1),
            retry: RetryConfig::new(
                settings.send_max_retries,
                Duration::from_millis(settings.retry_backoff_ms),
            ),
            contacted_status: settings.contacted_status,
        }
    }
}

#[derive(Clone)]
pub struct OutreachService {
    identities: Arc<dyn IdentityStore>,
    contacts: Arc<dyn ContactStore>,
    transport: Arc<dyn MessageTransport>,
    schools: Arc<SchoolDirectory>,
    options: OutreachOptions,
}

impl OutreachService {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        contacts: Arc<dyn ContactStore>,
        transport: Arc<dyn MessageTransport>,
        schools: Arc<SchoolDirectory>,
        options: OutreachOptions,
    ) -> Self {
        Self {
            identities,
            contacts,
            transport,
            schools,
            options,
        }
    }

    /// Send `draft` to every selected recipient.
    ///
    /// Returns `Err` only when a precondition fails (nothing was sent) or the
    /// contact fetch fails (nothing was sent). Per-recipient failures are
    /// reported inside the [`BulkSendReport`].
    pub async fn send_bulk(&self, session: &Session, draft: &OutreachDraft) -> Result<BulkSendReport> {
        check_draft_fields(&draft.subject, &draft.body, draft.recipient_ids.len())?;

        let sender = self
            .identities
            .find_by_owner(session.user_id)
            .await?
            .ok_or(OutreachError::IdentityRequired)?;

        let contacts: HashMap<Uuid, CoachContact> = self
            .contacts
            .get_contacts(session.user_id, &draft.recipient_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        info!(
            user_id = %session.user_id,
            sender = %sender.address(),
            recipients = draft.recipient_ids.len(),
            concurrency = self.options.max_concurrency,
            "Starting bulk outreach send"
        );

        let jobs: Vec<(Uuid, Option<CoachContact>)> = draft
            .recipient_ids
            .iter()
            .map(|id| (*id, contacts.get(id).cloned()))
            .collect();

        let report: BulkSendReport = if self.options.max_concurrency <= 1 {
            let mut report = BulkSendReport::default();
            for (id, contact) in jobs {
                report.record(self.send_one(&sender, id, contact.as_ref(), draft).await);
            }
            report
        } else {
            let sender = &sender;
            stream::iter(jobs)
                .map(|(id, contact)| async move {
                    self.send_one(sender, id, contact.as_ref(), draft).await
                })
                .buffer_unordered(self.options.max_concurrency)
                .collect::<Vec<_>>()
                .await
                .into_iter()
                .collect()
        };

        info!(
            user_id = %session.user_id,
            success = report.success_count,
            failure = report.failure_count,
            "Bulk outreach send finished"
        );

        Ok(report)
    }

    async fn send_one(
        &self,
        sender: &EmailIdentity,
        contact_id: Uuid,
        contact: Option<&CoachContact>,
        draft: &OutreachDraft,
    ) -> RecipientOutcome {
        let Some(contact) = contact else {
            warn!(contact_id = %contact_id, "Selected contact not found; skipping");
            return failed(contact_id, None, "contact not found".to_string());
        };

        if !validate_email(&contact.coach_email) {
            warn!(contact_id = %contact_id, "Contact has an invalid email address; skipping");
            return failed(
                contact_id,
                Some(contact.coach_email.clone()),
                format!("invalid recipient address: {}", contact.coach_email),
            );
        }

        let message = self.render_message(sender, contact, draft);

        let result = with_retry(&self.options.retry, || self.transport.send(&message)).await;
        let receipt = match result {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(contact_id = %contact_id, error = %err, "Outreach send failed");
                return failed(contact_id, Some(message.to), err.to_string());
            }
        };

        let status_error = match self
            .contacts
            .update_status(contact_id, self.options.contacted_status, Utc::now())
            .await
        {
            Ok(()) => None,
            Err(err) => {
                // The message is already out; report it delivered but flag the bookkeeping gap
                warn!(
                    contact_id = %contact_id,
                    error = %err,
                    "Message delivered but contact status update failed"
                );
                Some(format!("status update failed: {}", err))
            }
        };

        RecipientOutcome {
            contact_id,
            recipient_address: Some(message.to),
            delivered: true,
            message_id: receipt.message_id,
            error: status_error,
        }
    }

    fn render_message(
        &self,
        sender: &EmailIdentity,
        contact: &CoachContact,
        draft: &OutreachDraft,
    ) -> OutboundMessage {
        let ctx = RenderContext::new(contact, sender, &self.schools);
        let text = render(&draft.body, &ctx);
        OutboundMessage {
            from: sender.mailbox(),
            to: contact.coach_email.clone(),
            subject: render(&draft.subject, &ctx),
            html: Some(html_alternative(&text)),
            text,
        }
    }
}

fn failed(contact_id: Uuid, address: Option<String>, reason: String) -> RecipientOutcome {
    RecipientOutcome {
        contact_id,
        recipient_address: address,
        delivered: false,
        message_id: None,
        error: Some(reason),
    }
}
