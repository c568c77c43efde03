mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{ClientInfo, NewContactMessage, NewSubscriber};
use crate::routes::error_chain_fmt;

pub use postgres::PostgresStore;

#[derive(thiserror::Error)]
pub enum StoreError {
    #[error("A subscriber with this email already exists")]
    Duplicate,
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Where submissions end up. Each call is a single atomic insert.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the email is already subscribed.
    async fn insert_subscriber(
        &self,
        subscriber: &NewSubscriber,
        client: &ClientInfo,
    ) -> Result<Uuid, StoreError>;

    async fn insert_contact_message(
        &self,
        message: &NewContactMessage,
        client: &ClientInfo,
    ) -> Result<Uuid, StoreError>;
}
