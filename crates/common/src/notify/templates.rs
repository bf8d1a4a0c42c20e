//! Email templates for contact notifications

use crate::config::MailConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Rendered email ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailTemplate {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Which relay template an email is sent through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    AdminNotification,
    StudentReply,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::AdminNotification => "admin_notification",
            TemplateKind::StudentReply => "student_reply",
        }
    }
}

/// A new contact message, as shown to admins
#[derive(Debug, Clone)]
pub struct ContactNotification<'a> {
    pub submission_id: Uuid,
    pub student_name: &'a str,
    pub student_email: &'a str,
    pub subject: &'a str,
    pub message_type: &'a str,
    pub message: &'a str,
    pub submitted_at: DateTime<Utc>,
}

/// An admin reply, as sent to the student
#[derive(Debug, Clone)]
pub struct ReplyNotification<'a> {
    pub student_name: &'a str,
    pub student_email: &'a str,
    pub original_subject: &'a str,
    pub original_message: &'a str,
    pub admin_reply: &'a str,
    pub replied_by: &'a str,
    pub replied_at: DateTime<Utc>,
}

/// Human label for a contact message type; unknown types pass through
pub fn format_message_type(message_type: &str) -> &str {
    match message_type {
        "general" => "General Inquiry",
        "technical" => "Technical Support",
        "account" => "Account Issues",
        "content" => "Content Issues",
        "faculty" => "Faculty Information",
        "course" => "Course Information",
        "bug_report" => "Bug Report",
        "feature_request" => "Feature Request",
        "feedback" => "Feedback & Suggestions",
        "other" => "Other",
        other => other,
    }
}

/// Escape text for inclusion in HTML
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escaped text with line breaks turned into `<br>`
fn html_paragraph(text: &str) -> String {
    escape_html(text).replace('\n', "<br>")
}

fn display_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

const STYLE: &str = "body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; }
        .container { max-width: 600px; margin: 0 auto; padding: 20px; }
        .content { padding: 20px; border: 1px solid #e9ecef; border-radius: 8px; }
        .quote { background: #f1f3f5; padding: 15px; border-left: 4px solid #0066cc; margin: 15px 0; }
        .footer { margin-top: 20px; padding-top: 20px; border-top: 1px solid #e9ecef; font-size: 12px; color: #666; }
        .label { font-weight: bold; color: #495057; }";

pub fn admin_notification_email(data: &ContactNotification<'_>, mail: &MailConfig) -> EmailTemplate {
    let app = &mail.app_name;
    let dashboard = format!("{}/admin", mail.app_url.trim_end_matches('/'));
    let message_type = format_message_type(data.message_type);
    let submitted = display_time(data.submitted_at);

    let subject = format!("[{}] New Contact Message: {}", app, data.subject);

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>New Contact Message - {app}</title>
    <style>
        {STYLE}
    </style>
</head>
<body>
    <div class="container">
        <h2>New Contact Message Received</h2>
        <p>A student has submitted a new contact message through {app}</p>
        <div class="content">
            <p><span class="label">From:</span> {name}</p>
            <p><span class="label">Email:</span> <a href="mailto:{email}">{email}</a></p>
            <p><span class="label">Subject:</span> {subject}</p>
            <p><span class="label">Message Type:</span> {message_type}</p>
            <p><span class="label">Submitted:</span> {submitted}</p>
            <div class="quote">
                <p class="label">Message:</p>
                <p>{message}</p>
            </div>
            <p><a href="{dashboard}">Open Admin Dashboard</a></p>
        </div>
        <div class="footer">
            <p>Reply directly to {email} or use the Admin Dashboard to send a formal reply.</p>
            <p>This is an automated notification from {app}.</p>
            <p>Submission ID: {id}</p>
        </div>
    </div>
</body>
</html>"#,
        app = escape_html(app),
        name = escape_html(data.student_name),
        email = escape_html(data.student_email),
        subject = escape_html(data.subject),
        message_type = escape_html(message_type),
        message = html_paragraph(data.message),
        id = data.submission_id,
    );

    let text = format!(
        "New Contact Message - {app}

From: {name} ({email})
Subject: {subject}
Message Type: {message_type}
Submitted: {submitted}

Message:
{message}

---
To reply: Send email to {email}
Admin Dashboard: {dashboard}
Submission ID: {id}",
        name = data.student_name,
        email = data.student_email,
        subject = data.subject,
        message = data.message,
        id = data.submission_id,
    );

    EmailTemplate {
        to: mail.admin_recipients.clone(),
        subject,
        html,
        text,
    }
}

pub fn student_reply_email(data: &ReplyNotification<'_>, mail: &MailConfig) -> EmailTemplate {
    let app = &mail.app_name;
    let replied = display_time(data.replied_at);

    let subject = format!("[{}] Reply to your message: {}", app, data.original_subject);

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Reply from {app} Admin Team</title>
    <style>
        {STYLE}
    </style>
</head>
<body>
    <div class="container">
        <h2>Reply from {app} Admin Team</h2>
        <p>Hello {name},</p>
        <p>Thank you for contacting us. We have a response to your message:</p>
        <div class="content">
            <div class="quote">
                <p class="label">Your Original Message:</p>
                <p><strong>Subject:</strong> {subject}</p>
                <p>{original}</p>
            </div>
            <div class="quote">
                <p class="label">Our Reply:</p>
                <p>{reply}</p>
            </div>
            <p><span class="label">Replied by:</span> {replied_by}</p>
            <p><span class="label">Reply date:</span> {replied}</p>
        </div>
        <div class="footer">
            <p>If you have any follow-up questions, please contact us again through the {app} contact form.</p>
            <p><strong>Best regards,</strong><br>{app} Admin Team</p>
            <p>This is an automated message. Please do not reply directly to this email.</p>
        </div>
    </div>
</body>
</html>"#,
        app = escape_html(app),
        name = escape_html(data.student_name),
        subject = escape_html(data.original_subject),
        original = html_paragraph(data.original_message),
        reply = html_paragraph(data.admin_reply),
        replied_by = escape_html(data.replied_by),
    );

    let text = format!(
        "Reply from {app} Admin Team

Hello {name},

Thank you for contacting us. Here is our response to your message:

Your Original Message:
Subject: {subject}
{original}

Our Reply:
{reply}

---
Replied by: {replied_by}
Reply date: {replied}

If you have any follow-up questions, please feel free to contact us again.

Best regards,
{app} Admin Team",
        name = data.student_name,
        subject = data.original_subject,
        original = data.original_message,
        reply = data.admin_reply,
        replied_by = data.replied_by,
    );

    EmailTemplate {
        to: vec![data.student_email.to_string()],
        subject,
        html,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn submitted() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_format_message_type() {
        assert_eq!(format_message_type("general"), "General Inquiry");
        assert_eq!(format_message_type("feedback"), "Feedback & Suggestions");
        assert_eq!(format_message_type("bug_report"), "Bug Report");
        assert_eq!(format_message_type("custom"), "custom");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"Tom\" & 'Jerry'</b>"), "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;");
    }

    #[test]
    fn test_admin_notification() {
        let mail = MailConfig::default();
        let data = ContactNotification {
            submission_id: Uuid::nil(),
            student_name: "Rafi",
            student_email: "rafi@g.bracu.ac.bd",
            subject: "Broken <link>",
            message_type: "technical",
            message: "line one\nline two",
            submitted_at: submitted(),
        };

        let email = admin_notification_email(&data, &mail);
        assert_eq!(email.subject, "[BRACU Loop] New Contact Message: Broken <link>");
        assert_eq!(email.to, mail.admin_recipients);
        assert!(email.html.contains("Broken &lt;link&gt;"));
        assert!(email.html.contains("line one<br>line two"));
        assert!(email.html.contains("Technical Support"));
        assert!(email.text.contains("From: Rafi (rafi@g.bracu.ac.bd)"));
        assert!(email.text.contains("Submitted: 2024-05-01 09:30 UTC"));
        assert!(email.text.contains("Admin Dashboard: https://braculoop.app/admin"));
    }

    #[test]
    fn test_student_reply() {
        let mail = MailConfig::default();
        let data = ReplyNotification {
            student_name: "Rafi",
            student_email: "rafi@g.bracu.ac.bd",
            original_subject: "Help",
            original_message: "Where are the notes?",
            admin_reply: "Check the Notes page.\nThanks!",
            replied_by: "admin",
            replied_at: submitted(),
        };

        let email = student_reply_email(&data, &mail);
        assert_eq!(email.subject, "[BRACU Loop] Reply to your message: Help");
        assert_eq!(email.to, vec!["rafi@g.bracu.ac.bd".to_string()]);
        assert!(email.html.contains("Check the Notes page.<br>Thanks!"));
        assert!(email.text.contains("Hello Rafi,"));
        assert!(email.text.contains("Replied by: admin"));
    }
}
