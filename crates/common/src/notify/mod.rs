//! Email notifications
//!
//! Templates for contact-form traffic and the delivery seam behind them.

pub mod mailer;
pub mod templates;

pub use mailer::{deliver, mailto_link, Delivery, LogMailer, Mailer, RelayMailer};
pub use templates::{
    admin_notification_email, format_message_type, student_reply_email, ContactNotification,
    EmailTemplate, ReplyNotification, TemplateKind,
};

use crate::config::MailConfig;
use crate::errors::Result;
use std::sync::Arc;

/// Relay mailer when configured, otherwise the logging fallback
pub fn mailer_from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>> {
    Ok(match RelayMailer::from_config(config)? {
        Some(relay) => Arc::new(relay),
        None => Arc::new(LogMailer),
    })
}
