//! Mail client: delivers contact-form submissions through an HTTP mail API
//! (Resend-compatible JSON, bearer auth).
//!
//! Handlers only see the `MailTransport` trait; `MailClient` is the production
//! implementation.
use std::time::Duration;

use async_trait::async_trait;
use handlebars::html_escape;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_MAIL_API_URL: &str = "https://api.resend.com/emails";
const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Mail API still failing after {retries} retries")]
    Exhausted { retries: u32 },
}

/// One contact-form submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactMessage {
    /// Email body. Every field is visitor input and is escaped.
    pub fn to_html(&self) -> String {
        format!(
            "<div>\
<h1>New Contact Form Submission</h1>\
<p>You have received a new message from your portfolio contact form.</p>\
<hr />\
<h2>Message Details:</h2>\
<ul>\
<li><strong>Name:</strong> {}</li>\
<li><strong>Email:</strong> {}</li>\
<li><strong>Subject:</strong> {}</li>\
</ul>\
<hr />\
<h2>Message:</h2>\
<p>{}</p>\
</div>",
            html_escape(&self.name),
            html_escape(&self.email),
            html_escape(&self.subject),
            html_escape(&self.message),
        )
    }
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn submit(&self, message: &ContactMessage) -> Result<(), MailError>;
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    reply_to: &'a str,
    subject: String,
    html: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<String>,
}

/// Posts each message to the mail API, retrying 429 and 5xx responses with
/// exponential backoff.
#[derive(Clone)]
pub struct MailClient {
    client: Client,
    config: MailConfig,
    base_delay: Duration,
}

impl MailClient {
    pub fn new(config: MailConfig) -> Result<Self, MailError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            config,
            base_delay: Duration::from_secs(1),
        })
    }

    /// First retry waits `delay`, each later one twice as long.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }
}

#[async_trait]
impl MailTransport for MailClient {
    async fn submit(&self, message: &ContactMessage) -> Result<(), MailError> {
        let body = SendRequest {
            from: &self.config.from,
            to: [&self.config.to],
            reply_to: &message.email,
            subject: format!("Contact Form: {}", message.subject),
            html: message.to_html(),
        };

        let mut last_error: Option<MailError> = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = self.base_delay * (1 << (attempt - 1));
                warn!(
                    "Mail send attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.config.api_url)
                .bearer_auth(&self.config.api_key)
                .json(&body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(MailError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let text = response.text().await.unwrap_or_default();
                warn!("Mail API returned {}: {}", status, text);
                last_error = Some(MailError::Api {
                    status: status.as_u16(),
                    message: text,
                });
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(MailError::Api {
                    status: status.as_u16(),
                    message: text,
                });
            }

            let sent: SendResponse = response.json().await.unwrap_or(SendResponse { id: None });
            debug!("Contact message accepted by mail API (id={:?})", sent.id);
            return Ok(());
        }

        Err(last_error.unwrap_or(MailError::Exhausted {
            retries: MAX_RETRIES,
        }))
    }
}
