use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::field::display;
use tracing::Span;

use super::{error_chain_fmt, json_error, json_message};
use crate::app::AppState;
use crate::domain::{
    ClientInfo, ContactName, Interest, MessageBody, NewContactMessage, Organization,
    SubscriberEmail,
};
use crate::notifications::Notification;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    name: String,
    email: String,
    #[serde(default)]
    organization: Option<String>,
    interest: String,
    message: String,
    #[serde(default)]
    recaptcha_token: String,
}

impl TryFrom<ContactRequest> for NewContactMessage {
    type Error = String;

    fn try_from(request: ContactRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            name: ContactName::parse(request.name)?,
            email: SubscriberEmail::parse(request.email)?,
            organization: Organization::parse(request.organization)?,
            interest: Interest::try_from(request.interest)?,
            message: MessageBody::parse(request.message)?,
        })
    }
}

#[derive(thiserror::Error)]
pub enum ContactError {
    #[error("{0}")]
    ValidationError(String),
    #[error("reCAPTCHA verification failed")]
    VerificationFailed,
    #[error("Failed to save message")]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for ContactError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl IntoResponse for ContactError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::ValidationError(_) | Self::VerificationFailed => {
                tracing::info!(error.message = %self, "Contact message rejected");
                StatusCode::BAD_REQUEST
            },
            Self::UnexpectedError(_) => {
                tracing::error!(
                    error.cause_chain = ?self,
                    error.message = %self,
                    "Failed to save a contact message"
                );
                StatusCode::INTERNAL_SERVER_ERROR
            },
        };
        json_error(status, self.to_string())
    }
}

#[tracing::instrument(
    name = "Receiving a contact message",
    skip_all,
    fields(
        sender_email = tracing::field::Empty,
        interest = tracing::field::Empty,
        message_id = tracing::field::Empty
    )
)]
pub async fn send_contact_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<Response, ContactError> {
    let Json(mut request) = payload.map_err(|rejection| {
        tracing::info!(rejection = %rejection.body_text(), "Malformed contact request");
        ContactError::ValidationError("Invalid request body".to_string())
    })?;
    let captcha_token = std::mem::take(&mut request.recaptcha_token);
    let message: NewContactMessage = request.try_into().map_err(ContactError::ValidationError)?;
    Span::current()
        .record("sender_email", &display(&message.email))
        .record("interest", &display(message.interest));

    if !state.captcha_client.is_human(&captcha_token).await {
        return Err(ContactError::VerificationFailed);
    }

    let client = ClientInfo::from_headers(&headers);
    let message_id = state
        .store
        .insert_contact_message(&message, &client)
        .await
        .context("Failed to insert contact message in the database.")?;
    Span::current().record("message_id", &display(message_id));

    state.notifier.dispatch(Notification::ContactMessage(message));

    Ok(json_message("Message saved successfully"))
}
