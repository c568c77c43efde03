use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::field::display;
use tracing::Span;

use super::{error_chain_fmt, json_error, json_message};
use crate::app::AppState;
use crate::domain::{ClientInfo, NewSubscriber, SubscriberEmail};
use crate::notifications::Notification;
use crate::store::StoreError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    email: String,
    #[serde(default)]
    recaptcha_token: String,
}

impl TryFrom<SubscriptionRequest> for NewSubscriber {
    type Error = String;

    fn try_from(request: SubscriptionRequest) -> Result<Self, Self::Error> {
        let email = SubscriberEmail::parse(request.email)?;
        Ok(Self { email })
    }
}

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("{0}")]
    ValidationError(String),
    #[error("reCAPTCHA verification failed")]
    VerificationFailed,
    #[error("Email already subscribed")]
    AlreadySubscribed,
    #[error("Failed to save subscription")]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl IntoResponse for SubscribeError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::ValidationError(_) | Self::VerificationFailed => StatusCode::BAD_REQUEST,
            Self::AlreadySubscribed => StatusCode::CONFLICT,
            Self::UnexpectedError(_) => {
                tracing::error!(
                    error.cause_chain = ?self,
                    error.message = %self,
                    "Failed to add a new subscriber"
                );
                StatusCode::INTERNAL_SERVER_ERROR
            },
        };
        if status.is_client_error() {
            tracing::info!(error.message = %self, "Subscription rejected");
        }
        json_error(status, self.to_string())
    }
}

#[tracing::instrument(
    name = "Adding a new subscriber",
    skip_all,
    fields(subscriber_email = tracing::field::Empty, subscriber_id = tracing::field::Empty)
)]
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SubscriptionRequest>, JsonRejection>,
) -> Result<Response, SubscribeError> {
    let Json(mut request) = payload.map_err(|rejection| {
        tracing::info!(rejection = %rejection.body_text(), "Malformed subscription request");
        SubscribeError::ValidationError("Invalid request body".to_string())
    })?;
    let captcha_token = std::mem::take(&mut request.recaptcha_token);
    let new_subscriber: NewSubscriber = request
        .try_into()
        .map_err(SubscribeError::ValidationError)?;
    Span::current().record("subscriber_email", &display(&new_subscriber.email));

    if !state.captcha_client.is_human(&captcha_token).await {
        return Err(SubscribeError::VerificationFailed);
    }

    let client = ClientInfo::from_headers(&headers);
    let subscriber_id = state
        .store
        .insert_subscriber(&new_subscriber, &client)
        .await
        .map_err(|e| match e {
            StoreError::Duplicate => SubscribeError::AlreadySubscribed,
            StoreError::Unexpected(e) => SubscribeError::UnexpectedError(
                e.context("Failed to insert new subscriber in the database."),
            ),
        })?;
    Span::current().record("subscriber_id", &display(subscriber_id));

    state.notifier.dispatch(Notification::NewSubscriber {
        email: new_subscriber.email,
        subscribed_at: OffsetDateTime::now_utc(),
    });

    Ok(json_message("Successfully subscribed to newsletter"))
}
