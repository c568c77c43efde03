use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use katari_forms::app::{build, run_migrations};
use katari_forms::config::{get_configuration, DatabaseSettings, Settings};
use katari_forms::domain::{ClientInfo, NewContactMessage, NewSubscriber};
use katari_forms::store::{PostgresStore, StoreError, SubmissionStore};
use katari_forms::telemetry::setup_tracing;
use once_cell::sync::Lazy;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static TRACING: Lazy<()> = Lazy::new(|| {
    let name = "test";
    let env_filter = "debug";
    if std::env::var("TEST_LOG").is_ok() {
        setup_tracing(name, env_filter, std::io::stdout);
    } else {
        setup_tracing(name, env_filter, std::io::sink);
    };
});

pub const CAPTCHA_PATH: &str = "/recaptcha/api/siteverify";
pub const NOTIFICATION_RECIPIENT: &str = "fresh@katari.farm";
pub const NEWSLETTER_SENDER: &str = "newsletter@katari.farm";
pub const CONTACT_SENDER: &str = "contact@katari.farm";

#[derive(Debug, Clone)]
pub struct StoredSubscriber {
    pub email: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StoredContactMessage {
    pub name: String,
    pub email: String,
    pub organization: Option<String>,
    pub interest: String,
    pub message: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Same contract as the Postgres store: unique subscriber emails, unconstrained
/// contact messages.
#[derive(Default)]
pub struct InMemoryStore {
    subscribers: Mutex<Vec<StoredSubscriber>>,
    contact_messages: Mutex<Vec<StoredContactMessage>>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn go_offline(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("connection refused").into());
        }
        Ok(())
    }
}

#[async_trait]
impl SubmissionStore for InMemoryStore {
    async fn insert_subscriber(
        &self,
        subscriber: &NewSubscriber,
        client: &ClientInfo,
    ) -> Result<Uuid, StoreError> {
        self.check_available()?;
        let mut subscribers = self.subscribers.lock().unwrap();
        if subscribers
            .iter()
            .any(|s| s.email == subscriber.email.as_ref())
        {
            return Err(StoreError::Duplicate);
        }
        subscribers.push(StoredSubscriber {
            email: subscriber.email.as_ref().to_owned(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        });
        Ok(Uuid::new_v4())
    }

    async fn insert_contact_message(
        &self,
        message: &NewContactMessage,
        client: &ClientInfo,
    ) -> Result<Uuid, StoreError> {
        self.check_available()?;
        self.contact_messages
            .lock()
            .unwrap()
            .push(StoredContactMessage {
                name: message.name.as_ref().to_owned(),
                email: message.email.as_ref().to_owned(),
                organization: message.organization.as_ref().map(|o| o.as_ref().to_owned()),
                interest: message.interest.as_str().to_owned(),
                message: message.message.as_ref().to_owned(),
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
            });
        Ok(Uuid::new_v4())
    }
}

pub struct TestApp<S = InMemoryStore> {
    pub address: String,
    pub store: Arc<S>,
    pub captcha_server: MockServer,
    pub email_server: MockServer,
}

impl<S> TestApp<S> {
    pub async fn post_subscriptions(&self, body: &serde_json::Value) -> reqwest::Response {
        self.post_json("/subscriptions", body).await
    }

    pub async fn post_contact(&self, body: &serde_json::Value) -> reqwest::Response {
        self.post_json("/contact", body).await
    }

    pub async fn post_json(&self, route: &str, body: &serde_json::Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(&format!("{}{}", &self.address, route))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_raw(&self, route: &str, body: &'static str) -> reqwest::Response {
        reqwest::Client::new()
            .post(&format!("{}{}", &self.address, route))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn captcha_scores(&self, score: f64) {
        Mock::given(path(CAPTCHA_PATH))
            .and(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "score": score,
                "action": "submit",
            })))
            .mount(&self.captcha_server)
            .await;
    }

    pub async fn email_api_responds_with(&self, status: u16) {
        Mock::given(path("/emails"))
            .and(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.email_server)
            .await;
    }

    /// Notifications are sent from a detached task, so give it a moment.
    pub async fn wait_for_emails(&self, expected: usize) -> Vec<serde_json::Value> {
        for _ in 0..100 {
            let received = self.email_server.received_requests().await.unwrap_or_default();
            if received.len() >= expected {
                return received
                    .iter()
                    .map(|request| serde_json::from_slice(&request.body).unwrap())
                    .collect();
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("Expected {expected} notification email(s) to be sent");
    }
}

impl TestApp<InMemoryStore> {
    pub fn subscribers(&self) -> Vec<StoredSubscriber> {
        self.store.subscribers.lock().unwrap().clone()
    }

    pub fn contact_messages(&self) -> Vec<StoredContactMessage> {
        self.store.contact_messages.lock().unwrap().clone()
    }
}

fn test_configuration(captcha_server: &MockServer, email_server: &MockServer) -> Settings {
    let mut c = get_configuration().expect("Failed to read configuration.");
    c.application.port = 0;
    c.email_client.base_url = email_server.uri();
    c.captcha.verify_url = format!("{}{}", captcha_server.uri(), CAPTCHA_PATH);
    c.notifications.recipient_email = NOTIFICATION_RECIPIENT.to_string();
    c.notifications.newsletter_sender_email = NEWSLETTER_SENDER.to_string();
    c.notifications.contact_sender_email = CONTACT_SENDER.to_string();
    c
}

async fn spawn_app_with<S>(config: &Settings, store: Arc<S>) -> String
where
    S: SubmissionStore + 'static,
{
    let server = build(config, store).expect("Failed to build the application.");
    let address = format!("http://{}", server.local_addr());
    let _ = tokio::spawn(server);
    address
}

pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let captcha_server = MockServer::start().await;
    let email_server = MockServer::start().await;
    let config = test_configuration(&captcha_server, &email_server);

    let store = Arc::new(InMemoryStore::default());
    let address = spawn_app_with(&config, store.clone()).await;

    TestApp {
        address,
        store,
        captcha_server,
        email_server,
    }
}

/// Same as [`spawn_app`], backed by a freshly migrated Postgres database.
pub async fn spawn_app_with_postgres() -> (TestApp<PostgresStore>, PgPool) {
    Lazy::force(&TRACING);

    let captcha_server = MockServer::start().await;
    let email_server = MockServer::start().await;
    let mut config = test_configuration(&captcha_server, &email_server);
    config.database.database_name = Uuid::new_v4().to_string();

    let db_pool = configure_database(&config.database).await;
    let store = Arc::new(PostgresStore::new(db_pool.clone()));
    let address = spawn_app_with(&config, store.clone()).await;

    let app = TestApp {
        address,
        store,
        captcha_server,
        email_server,
    };
    (app, db_pool)
}

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    PgConnection::connect_with(&config.without_db())
        .await
        .expect("Failed to connect to Postgres")
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.database_name).as_str())
        .await
        .expect("Failed to create database.");

    let db_pool = PgPool::connect_with(config.with_db())
        .await
        .expect("Failed to connect to Postgres.");

    run_migrations(&db_pool)
        .await
        .expect("Error running migrations.");

    db_pool
}
