use anyhow::Context;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;

use crate::domain::SubscriberEmail;

#[derive(Debug)]
pub struct EmailClient {
    http_client: Client,
    endpoint: Url,
    authorization_token: Secret<String>,
}

impl EmailClient {
    /// `base_url` may carry a path prefix; `emails` is appended to it.
    pub fn new(
        base_url: &str,
        authorization_token: Secret<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, anyhow::Error> {
        let endpoint = Url::parse(base_url)
            .and_then(|mut url| {
                if !url.path().ends_with('/') {
                    let path = format!("{}/", url.path());
                    url.set_path(&path);
                }
                url.join("emails")
            })
            .with_context(|| format!("Invalid email API base url: {base_url}"))?;
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build the email HTTP client")?;
        Ok(Self {
            http_client,
            endpoint,
            authorization_token,
        })
    }

    #[tracing::instrument(
        name = "Send email",
        skip_all,
        fields(sender = %sender, recipient = %recipient, subject = %subject)
    )]
    pub async fn send_email(
        &self,
        sender: &SubscriberEmail,
        recipient: &SubscriberEmail,
        subject: &str,
        html_content: &str,
    ) -> Result<(), reqwest::Error> {
        let request_body = SendEmailRequest {
            from: sender.as_ref(),
            to: [recipient.as_ref()],
            subject,
            html: html_content,
        };

        self.http_client
            .post(self.endpoint.clone())
            .bearer_auth(self.authorization_token.expose_secret())
            .json(&request_body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}
