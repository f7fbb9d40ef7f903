/// Outbound mail transports
///
/// - `HttpMessageTransport`: Mailgun-style messages API (form POST, basic auth)
/// - `SmtpMessageTransport`: direct SMTP relay via lettre
/// - `NoopTransport`: logs and acknowledges without delivering
use crate::config::{TransportKind, TransportSettings};
use crate::error::{OutreachError, Result};
use crate::models::{OutboundMessage, SendReceipt};
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Delivers one rendered message to one recipient
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt>;
}

/// Build the transport selected by configuration
pub fn build_transport(settings: &TransportSettings) -> Result<Arc<dyn MessageTransport>> {
    match settings.kind {
        TransportKind::Http => Ok(Arc::new(HttpMessageTransport::from_settings(settings)?)),
        TransportKind::Smtp => Ok(Arc::new(SmtpMessageTransport::new(settings)?)),
        TransportKind::Noop => {
            warn!("Mail transport not configured; outreach will operate in no-op mode");
            Ok(Arc::new(NoopTransport))
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesApiResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Mailgun-style HTTP messages API
#[derive(Clone)]
pub struct HttpMessageTransport {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl HttpMessageTransport {
    pub fn new(api_base_url: &str, sending_domain: &str, api_key: &str, http: Client) -> Self {
        Self {
            http,
            endpoint: format!(
                "{}/{}/messages",
                api_base_url.trim_end_matches('/'),
                sending_domain
            ),
            api_key: api_key.to_string(),
        }
    }

    pub fn from_settings(settings: &TransportSettings) -> Result<Self> {
        let api_key = settings.api_key.as_deref().ok_or_else(|| {
            OutreachError::Configuration("MAIL_API_KEY not configured".to_string())
        })?;
        let domain = settings.sending_domain.as_deref().ok_or_else(|| {
            OutreachError::Configuration("MAIL_SENDING_DOMAIN not configured".to_string())
        })?;
        let http = super::build_http_client(settings.request_timeout())?;
        Ok(Self::new(&settings.api_base_url, domain, api_key, http))
    }
}

#[async_trait]
impl MessageTransport for HttpMessageTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt> {
        let mut form: Vec<(&str, &str)> = vec![
            ("from", message.from.as_str()),
            ("to", message.to.as_str()),
            ("subject", message.subject.as_str()),
            ("text", message.text.as_str()),
        ];
        if let Some(html) = &message.html {
            form.push(("html", html.as_str()));
        }

        debug!(endpoint = %self.endpoint, to = %message.to, "Submitting message to mail API");

        let response = self
            .http
            .post(&self.endpoint)
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await
            .map_err(|e| OutreachError::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read response body".to_string());
            let reason = serde_json::from_str::<MessagesApiResponse>(&body)
                .ok()
                .and_then(|r| r.message)
                .unwrap_or(body);
            return Err(OutreachError::Transport(format!(
                "mail API rejected message ({}): {}",
                status, reason
            )));
        }

        // Accepted; the id is informational only
        let message_id = response
            .json::<MessagesApiResponse>()
            .await
            .ok()
            .and_then(|body| body.id);
        if message_id.is_none() {
            debug!(to = %message.to, "Mail API accepted message without a readable id");
        }

        Ok(SendReceipt { message_id })
    }
}

/// SMTP relay transport
#[derive(Clone)]
pub struct SmtpMessageTransport {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpMessageTransport {
    pub fn new(settings: &TransportSettings) -> Result<Self> {
        if settings.smtp_host.trim().is_empty() {
            return Err(OutreachError::Configuration(
                "SMTP_HOST must be set for the smtp transport".to_string(),
            ));
        }

        let builder = if settings.use_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)
        }
        .map_err(|e| {
            OutreachError::Configuration(format!("Failed to configure SMTP transport: {}", e))
        })?
        .port(settings.smtp_port);

        let builder = if let (Some(username), Some(password)) =
            (&settings.smtp_username, &settings.smtp_password)
        {
            builder.credentials(Credentials::new(username.to_string(), password.to_string()))
        } else {
            builder
        };

        Ok(Self {
            transport: Arc::new(builder.build()),
        })
    }
}

/// Build a lettre message with a plain part and, when present, an HTML alternative
pub fn build_mime_message(message: &OutboundMessage) -> Result<Message> {
    let from = message.from.parse::<Mailbox>().map_err(|e| {
        OutreachError::Configuration(format!("Invalid sender address: {}", e))
    })?;
    let to = message.to.parse::<Mailbox>()?;

    let builder = Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.as_str());

    let email = match &message.html {
        Some(html) => builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(header::ContentType::TEXT_PLAIN)
                        .body(message.text.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(header::ContentType::TEXT_HTML)
                        .body(html.clone()),
                ),
        )?,
        None => builder
            .header(header::ContentType::TEXT_PLAIN)
            .body(message.text.clone())?,
    };

    Ok(email)
}

#[async_trait]
impl MessageTransport for SmtpMessageTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt> {
        let email = build_mime_message(message)?;
        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| OutreachError::Transport(format!("Failed to send email: {}", e)))?;

        let message_id = response.message().next().map(|line| line.to_string());
        info!(to = %message.to, "email sent successfully");
        Ok(SendReceipt { message_id })
    }
}

/// Acknowledges every message without delivering it
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransport;

#[async_trait]
impl MessageTransport for NoopTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt> {
        info!(
            subject = %message.subject,
            recipient = %message.to,
            "Mail transport running in no-op mode; skipping actual send"
        );
        Ok(SendReceipt::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmailIdentity;
    use crate::services::retry::{with_retry, RetryConfig};
    use serde_json::json;
    use std::time::Duration;
    use uuid::Uuid;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message(html: Option<&str>) -> OutboundMessage {
        OutboundMessage {
            from: "\"Jake Davids\" <jakedavids@recruit.test>".to_string(),
            to: "ksmart@uga.edu".to_string(),
            subject: "Recruiting interest".to_string(),
            text: "Coach Smart,\nI'd love to play for you.".to_string(),
            html: html.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_http_transport_returns_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/recruit.test/messages"))
            .and(header_exists("authorization"))
            .and(body_string_contains("to=ksmart%40uga.edu"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "<20261018.1@recruit.test>",
                "message": "Queued. Thank you."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let transport =
            HttpMessageTransport::new(&server.uri(), "recruit.test", "key-123", Client::new());
        let receipt = transport.send(&message(Some("<p>hi</p>"))).await.unwrap();

        assert_eq!(receipt.message_id.as_deref(), Some("<20261018.1@recruit.test>"));
    }

    #[tokio::test]
    async fn test_http_transport_accepts_non_json_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/recruit.test/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Queued. Thank you."))
            .expect(1)
            .mount(&server)
            .await;

        let transport =
            HttpMessageTransport::new(&server.uri(), "recruit.test", "key-123", Client::new());
        let msg = message(None);
        let retry = RetryConfig::new(2, Duration::from_millis(1));
        let receipt = with_retry(&retry, || transport.send(&msg))
            .await
            .unwrap();

        assert!(receipt.message_id.is_none());
    }

    #[tokio::test]
    async fn test_http_transport_surfaces_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({ "message": "'to' parameter is not a valid address" })),
            )
            .mount(&server)
            .await;

        let transport =
            HttpMessageTransport::new(&server.uri(), "recruit.test", "key-123", Client::new());
        let err = transport.send(&message(None)).await.unwrap_err();

        assert!(matches!(err, OutreachError::Transport(_)));
        assert!(err.to_string().contains("not a valid address"));
    }

    #[test]
    fn test_build_mime_message_with_html_alternative() {
        let email = build_mime_message(&message(Some("<p>hi</p>"))).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("text/html"));
    }

    #[test]
    fn test_build_mime_message_accepts_escaped_sender_names() {
        for name in ["Jake \\", "Jake \"JD\" Davids", "Jake\r\nBcc: x@evil.test"] {
            let sender = EmailIdentity {
                user_id: Uuid::new_v4(),
                username: "jakedavids".to_string(),
                domain: "recruit.test".to_string(),
                display_name: name.to_string(),
                verified: true,
                created_at: None,
            };
            let mut msg = message(None);
            msg.from = sender.mailbox();

            let email = build_mime_message(&msg).unwrap();
            let raw = String::from_utf8(email.formatted()).unwrap();
            assert!(raw.contains("<jakedavids@recruit.test>"));
            assert!(!raw.contains("\r\nBcc:"));
        }
    }

    #[test]
    fn test_build_mime_message_rejects_bad_recipient() {
        let mut msg = message(None);
        msg.to = "not-an-address".to_string();
        assert!(matches!(
            build_mime_message(&msg),
            Err(OutreachError::InvalidRecipient(_))
        ));
    }

    #[tokio::test]
    async fn test_noop_transport_acknowledges() {
        let receipt = NoopTransport.send(&message(None)).await.unwrap();
        assert!(receipt.message_id.is_none());
    }
}
