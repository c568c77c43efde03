use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{StoreError, SubmissionStore};
use crate::domain::{ClientInfo, NewContactMessage, NewSubscriber};

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_error) => db_error.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

#[async_trait]
impl SubmissionStore for PostgresStore {
    #[tracing::instrument(name = "Saving new subscriber in the database", skip_all)]
    async fn insert_subscriber(
        &self,
        subscriber: &NewSubscriber,
        client: &ClientInfo,
    ) -> Result<Uuid, StoreError> {
        let subscriber_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO newsletter_subscribers (id, email, ip_address, user_agent, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(subscriber_id)
        .bind(subscriber.email.as_ref())
        .bind(client.ip_address.as_deref())
        .bind(client.user_agent.as_deref())
        .bind(OffsetDateTime::now_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate
            } else {
                StoreError::Unexpected(
                    anyhow::Error::new(e).context("Failed to insert newsletter subscriber"),
                )
            }
        })?;
        Ok(subscriber_id)
    }

    #[tracing::instrument(name = "Saving contact message in the database", skip_all)]
    async fn insert_contact_message(
        &self,
        message: &NewContactMessage,
        client: &ClientInfo,
    ) -> Result<Uuid, StoreError> {
        let message_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO contact_messages
                (id, name, email, organization, interest, message,
                 ip_address, user_agent, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(message_id)
        .bind(message.name.as_ref())
        .bind(message.email.as_ref())
        .bind(message.organization.as_ref().map(AsRef::<str>::as_ref))
        .bind(message.interest.as_str())
        .bind(message.message.as_ref())
        .bind(client.ip_address.as_deref())
        .bind(client.user_agent.as_deref())
        .bind(OffsetDateTime::now_utc())
        .execute(&self.pool)
        .await
        .context("Failed to insert contact message")?;
        Ok(message_id)
    }
}
