//! Mail delivery
//!
//! `RelayMailer` posts to an HTTP email relay. Without a relay configured,
//! `LogMailer` logs the message and hands back `mailto:` links instead.

use super::templates::{EmailTemplate, TemplateKind};
use crate::config::MailConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How an email left the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "delivery", rename_all = "snake_case")]
pub enum Delivery {
    /// Accepted by the relay for every recipient
    Sent { recipients: usize },
    /// Not sent; the caller can offer these links instead
    Fallback { mailto: Vec<String> },
}

/// Trait for outgoing mail
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &EmailTemplate, kind: TemplateKind) -> Result<Delivery>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Percent-encode for a URI component
fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// `mailto:` link carrying the subject and plain-text body
pub fn mailto_link(to: &str, subject: &str, body: &str) -> String {
    format!(
        "mailto:{}?subject={}&body={}",
        to,
        encode_component(subject),
        encode_component(body)
    )
}

/// Mailer that only logs and returns `mailto:` links
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &EmailTemplate, kind: TemplateKind) -> Result<Delivery> {
        info!(
            kind = kind.as_str(),
            recipients = ?email.to,
            subject = %email.subject,
            "Mail relay not configured, returning mailto links"
        );

        let mailto = email
            .to
            .iter()
            .map(|to| mailto_link(to, &email.subject, &email.text))
            .collect();
        Ok(Delivery::Fallback { mailto })
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: RelayParams<'a>,
}

#[derive(Serialize)]
struct RelayParams<'a> {
    to_email: &'a str,
    subject: &'a str,
    message_html: &'a str,
    message: &'a str,
    app_name: &'a str,
}

/// HTTP email relay client
pub struct RelayMailer {
    client: reqwest::Client,
    url: String,
    service_id: String,
    public_key: String,
    admin_template_id: String,
    reply_template_id: String,
    app_name: String,
    max_retry: Duration,
}

impl RelayMailer {
    /// Build a relay mailer; `None` when the relay is not fully configured
    pub fn from_config(config: &MailConfig) -> Result<Option<Self>> {
        let (Some(url), Some(service_id), Some(public_key)) =
            (&config.relay_url, &config.service_id, &config.public_key)
        else {
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create mail client: {}", e),
            })?;

        let admin_template_id = config
            .admin_template_id
            .clone()
            .unwrap_or_else(|| "admin_notification".to_string());
        let reply_template_id = config
            .reply_template_id
            .clone()
            .unwrap_or_else(|| "student_reply".to_string());

        Ok(Some(Self {
            client,
            url: url.clone(),
            service_id: service_id.clone(),
            public_key: public_key.clone(),
            admin_template_id,
            reply_template_id,
            app_name: config.app_name.clone(),
            max_retry: Duration::from_secs(config.max_retry_secs),
        }))
    }

    fn template_id(&self, kind: TemplateKind) -> &str {
        match kind {
            TemplateKind::AdminNotification => &self.admin_template_id,
            TemplateKind::StudentReply => &self.reply_template_id,
        }
    }

    async fn post_once(&self, body: &RelayRequest<'_>) -> std::result::Result<(), backoff::Error<AppError>> {
        let response = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| backoff::Error::transient(AppError::Mail {
                message: format!("Request failed: {}", e),
            }))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        let err = AppError::Mail {
            message: format!("Relay error {}: {}", status, text),
        };
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Err(backoff::Error::transient(err))
        } else {
            Err(backoff::Error::permanent(err))
        }
    }
}

#[async_trait]
impl Mailer for RelayMailer {
    async fn send(&self, email: &EmailTemplate, kind: TemplateKind) -> Result<Delivery> {
        for to in &email.to {
            let body = RelayRequest {
                service_id: &self.service_id,
                template_id: self.template_id(kind),
                user_id: &self.public_key,
                template_params: RelayParams {
                    to_email: to,
                    subject: &email.subject,
                    message_html: &email.html,
                    message: &email.text,
                    app_name: &self.app_name,
                },
            };

            let policy = ExponentialBackoff {
                max_elapsed_time: Some(self.max_retry),
                ..ExponentialBackoff::default()
            };

            retry(policy, || async {
                self.post_once(&body).await.inspect_err(|e| {
                    debug!(recipient = %to, error = %e, "Mail relay attempt failed");
                })
            })
            .await?;
        }

        Ok(Delivery::Sent {
            recipients: email.to.len(),
        })
    }

    fn name(&self) -> &'static str {
        "relay"
    }
}

/// Send `email`, never failing the caller.
///
/// Relay failures are logged and turned into a `mailto:` fallback.
pub async fn deliver(mailer: &dyn Mailer, email: &EmailTemplate, kind: TemplateKind) -> Delivery {
    match mailer.send(email, kind).await {
        Ok(delivery) => {
            crate::metrics::record_mail(kind.as_str(), matches!(delivery, Delivery::Sent { .. }));
            delivery
        }
        Err(e) => {
            warn!(
                mailer = mailer.name(),
                kind = kind.as_str(),
                error = %e,
                "Mail delivery failed, falling back to mailto links"
            );
            crate::metrics::record_mail(kind.as_str(), false);
            let mailto = email
                .to
                .iter()
                .map(|to| mailto_link(to, &email.subject, &email.text))
                .collect();
            Delivery::Fallback { mailto }
        }
    }
}
