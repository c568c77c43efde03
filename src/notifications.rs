use std::sync::Arc;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::Instrument;

use crate::domain::{NewContactMessage, SubscriberEmail};
use crate::email_client::EmailClient;
use crate::routes::error_chain_fmt;

/// Something the team inbox should hear about.
#[derive(Debug)]
pub enum Notification {
    NewSubscriber {
        email: SubscriberEmail,
        subscribed_at: OffsetDateTime,
    },
    ContactMessage(NewContactMessage),
}

/// From-addresses, one per submission kind.
#[derive(Debug, Clone)]
pub struct Senders {
    pub newsletter: SubscriberEmail,
    pub contact: SubscriberEmail,
}

impl Notification {
    pub const fn sender<'a>(&self, senders: &'a Senders) -> &'a SubscriberEmail {
        match self {
            Self::NewSubscriber { .. } => &senders.newsletter,
            Self::ContactMessage(_) => &senders.contact,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NewSubscriber { .. } => "new_subscriber",
            Self::ContactMessage(_) => "contact_message",
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Self::NewSubscriber { .. } => "New Newsletter Subscriber".to_string(),
            Self::ContactMessage(message) => {
                format!("New Contact Form Message from {}", message.name.as_ref())
            },
        }
    }

    /// Every user-supplied value is HTML-escaped.
    pub fn html_body(&self) -> String {
        match self {
            Self::NewSubscriber {
                email,
                subscribed_at,
            } => {
                let subscribed_at = subscribed_at
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| subscribed_at.to_string());
                format!(
                    "<h2>New Newsletter Subscription</h2>\
                     <p><strong>Email:</strong> {}</p>\
                     <p><strong>Subscribed at:</strong> {}</p>",
                    escape(email.as_ref()),
                    subscribed_at,
                )
            },
            Self::ContactMessage(message) => {
                let organization = message
                    .organization
                    .as_ref()
                    .map_or_else(|| "Not provided".to_string(), |o| escape(o.as_ref()));
                format!(
                    "<h2>New Contact Form Submission</h2>\
                     <p><strong>Name:</strong> {}</p>\
                     <p><strong>Email:</strong> {}</p>\
                     <p><strong>Organization:</strong> {}</p>\
                     <p><strong>Interest:</strong> {}</p>\
                     <p><strong>Message:</strong></p>\
                     <p>{}</p>",
                    escape(message.name.as_ref()),
                    escape(message.email.as_ref()),
                    organization,
                    message.interest.label(),
                    message
                        .message
                        .as_ref()
                        .lines()
                        .map(escape)
                        .collect::<Vec<_>>()
                        .join("<br>"),
                )
            },
        }
    }
}

fn escape(s: &str) -> String {
    ammonia::clean_text(s)
}

#[derive(thiserror::Error)]
pub enum NotificationError {
    #[error("Failed to deliver the notification email")]
    Delivery(#[from] reqwest::Error),
}

impl std::fmt::Debug for NotificationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Non-critical channel for side effects that follow a successful write.
///
/// Deliveries run on their own task; their errors are logged here and never
/// reach the request that triggered them.
pub struct Notifier {
    email_client: Arc<EmailClient>,
    recipient: SubscriberEmail,
    senders: Senders,
}

impl Notifier {
    pub const fn new(
        email_client: Arc<EmailClient>,
        recipient: SubscriberEmail,
        senders: Senders,
    ) -> Self {
        Self {
            email_client,
            recipient,
            senders,
        }
    }

    pub fn dispatch(&self, notification: Notification) {
        let email_client = Arc::clone(&self.email_client);
        let recipient = self.recipient.clone();
        let sender = notification.sender(&self.senders).clone();
        let span = tracing::info_span!(
            "Deliver best-effort notification",
            notification_kind = notification.kind(),
        );

        tokio::spawn(
            async move {
                match deliver(&email_client, &sender, &recipient, &notification).await {
                    Ok(()) => tracing::info!("Notification email sent"),
                    Err(e) => tracing::warn!(
                        error.cause_chain = ?e,
                        error.message = %e,
                        "Notification email could not be delivered. Skipping.",
                    ),
                }
            }
            .instrument(span),
        );
    }
}

async fn deliver(
    email_client: &EmailClient,
    sender: &SubscriberEmail,
    recipient: &SubscriberEmail,
    notification: &Notification,
) -> Result<(), NotificationError> {
    email_client
        .send_email(
            sender,
            recipient,
            &notification.subject(),
            &notification.html_body(),
        )
        .await?;
    Ok(())
}
