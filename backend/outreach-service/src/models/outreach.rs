use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Composer state for one send operation; never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachDraft {
    pub subject: String,
    pub body: String,
    pub recipient_ids: Vec<Uuid>,
}

/// One fully rendered message handed to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Sender mailbox (`Name <user@domain>`)
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

/// Transport acknowledgement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub message_id: Option<String>,
}

/// Per-recipient result inside a bulk send
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientOutcome {
    pub contact_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_address: Option<String>,
    pub delivered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate completion report for a bulk send
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkSendReport {
    pub success_count: usize,
    pub failure_count: usize,
    pub outcomes: Vec<RecipientOutcome>,
}

impl BulkSendReport {
    pub fn record(&mut self, outcome: RecipientOutcome) {
        if outcome.delivered {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.outcomes.push(outcome);
    }

    pub fn total(&self) -> usize {
        self.success_count + self.failure_count
    }

    pub fn outcome_for(&self, contact_id: Uuid) -> Option<&RecipientOutcome> {
        self.outcomes.iter().find(|o| o.contact_id == contact_id)
    }
}

impl FromIterator<RecipientOutcome> for BulkSendReport {
    fn from_iter<I: IntoIterator<Item = RecipientOutcome>>(iter: I) -> Self {
        let mut report = BulkSendReport::default();
        for outcome in iter {
            report.record(outcome);
        }
        report
    }
}
