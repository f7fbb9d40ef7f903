/// Outreach Service Library
///
/// Permanent sender identities and bulk coach outreach for the recruiting app.
///
/// ## Modules
///
/// - `config`: Service configuration
/// - `error`: Error types
/// - `http`: axum HTTP API
/// - `models`: Data models
/// - `services`: Workflows (reservation, outreach) and their collaborators
/// - `validators`: Input validation
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod services;
pub mod validators;

// Re-export commonly used types
pub use error::{OutreachError, Result};
pub use services::{OutreachService, ReservationService};
