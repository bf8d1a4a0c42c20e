//! Contact form handler

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use bracu_loop_common::{
    contact::{ContactForm, ContactRequest},
    errors::Result,
    notify::{admin_notification_email, deliver, ContactNotification, Delivery, TemplateKind},
};

#[derive(Serialize)]
pub struct ContactResponse {
    pub id: Uuid,
    pub status: String,
    pub delivery: Delivery,
}

/// Store a contact message and notify the admins.
///
/// The submission is kept even when the notification cannot be sent.
pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<ContactRequest>,
) -> Result<(StatusCode, Json<ContactResponse>)> {
    let form = ContactForm::sanitize(request)?;
    let contact = state.repo().create_contact(&form).await?;

    info!(
        contact_id = %contact.id,
        message_type = %contact.message_type,
        "Contact message received"
    );

    let notification = ContactNotification {
        submission_id: contact.id,
        student_name: &contact.student_name,
        student_email: &contact.student_email,
        subject: &contact.subject,
        message_type: &contact.message_type,
        message: &contact.message,
        submitted_at: contact.created_at.with_timezone(&Utc),
    };
    let email = admin_notification_email(&notification, &state.config.mail);
    let delivery = deliver(state.mailer.as_ref(), &email, TemplateKind::AdminNotification).await;

    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            id: contact.id,
            status: contact.status,
            delivery,
        }),
    ))
}
