use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Response tracking state of a coach contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    #[default]
    None,
    Sent,
    Contacted,
    Opened,
    Replied,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::None => "none",
            ResponseStatus::Sent => "sent",
            ResponseStatus::Contacted => "contacted",
            ResponseStatus::Opened => "opened",
            ResponseStatus::Replied => "replied",
        }
    }

    /// No outreach has been recorded for this contact yet
    pub fn is_pre_send(&self) -> bool {
        matches!(self, ResponseStatus::None)
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "" => Ok(ResponseStatus::None),
            "sent" => Ok(ResponseStatus::Sent),
            "contacted" => Ok(ResponseStatus::Contacted),
            "opened" => Ok(ResponseStatus::Opened),
            "replied" => Ok(ResponseStatus::Replied),
            other => Err(format!("unknown response status: {}", other)),
        }
    }
}

/// One coach at one school
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoachContact {
    pub id: Uuid,
    pub school_id: String,
    pub coach_name: String,
    pub coach_email: String,
    #[serde(default)]
    pub response_status: ResponseStatus,
    #[serde(default)]
    pub date_contacted: Option<DateTime<Utc>>,
}

impl CoachContact {
    /// Last whitespace-separated token of the coach name
    pub fn last_name(&self) -> &str {
        self.coach_name
            .split_whitespace()
            .last()
            .unwrap_or(self.coach_name.as_str())
    }
}
