use anyhow::Context;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

/// Talks to a reCAPTCHA v3 style `siteverify` endpoint.
#[derive(Debug)]
pub struct CaptchaClient {
    http_client: Client,
    verify_url: Url,
    secret_key: Secret<String>,
    score_threshold: f64,
}

/// What the provider thinks of a token.
#[derive(Debug, Deserialize)]
pub struct CaptchaVerdict {
    pub success: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

impl CaptchaVerdict {
    /// A verdict without a score never passes.
    pub fn passes(&self, threshold: f64) -> bool {
        self.success && self.score.map_or(false, |score| score > threshold)
    }
}

impl CaptchaClient {
    pub fn new(
        verify_url: &str,
        secret_key: Secret<String>,
        score_threshold: f64,
        timeout: std::time::Duration,
    ) -> Result<Self, anyhow::Error> {
        let verify_url = Url::parse(verify_url)
            .with_context(|| format!("Invalid captcha verification url: {verify_url}"))?;
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build the captcha HTTP client")?;
        Ok(Self {
            http_client,
            verify_url,
            secret_key,
            score_threshold,
        })
    }

    #[tracing::instrument(name = "Fetch captcha verdict", skip_all)]
    pub async fn verify(&self, token: &str) -> Result<CaptchaVerdict, reqwest::Error> {
        self.http_client
            .post(self.verify_url.clone())
            .form(&[
                ("secret", self.secret_key.expose_secret().as_str()),
                ("response", token),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<CaptchaVerdict>()
            .await
    }

    /// Fails closed: an empty token or an unreachable provider counts as a
    /// failed verification.
    #[tracing::instrument(
        name = "Verify captcha token",
        skip_all,
        fields(captcha_score = tracing::field::Empty)
    )]
    pub async fn is_human(&self, token: &str) -> bool {
        if token.trim().is_empty() {
            tracing::info!("Submission carried no captcha token");
            return false;
        }
        match self.verify(token).await {
            Ok(verdict) => {
                if let Some(score) = verdict.score {
                    tracing::Span::current().record("captcha_score", &score);
                }
                if !verdict.success {
                    tracing::info!(
                        error_codes = ?verdict.error_codes,
                        "Captcha provider rejected the token"
                    );
                }
                verdict.passes(self.score_threshold)
            },
            Err(e) => {
                tracing::error!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    "Captcha verification request failed"
                );
                false
            },
        }
    }
}
