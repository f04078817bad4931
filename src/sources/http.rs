use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::cache::{SharedError, Token, TokenRequest};
use crate::config::sources::{ServiceConfig, SourceConfig, DEFAULT_HTTP_TIMEOUT_MS};
use crate::resilience::retry::RetrySettings;

/// Token endpoint reached over HTTP.
///
/// Posts the identity, scopes and delegation address as JSON and expects
/// `{"access_token": .., "token_type": .., "expires_in": ..}` back.
#[derive(Debug, Clone)]
pub struct HttpTokenSource {
    url: String,
    headers: HashMap<String, String>,
    client: Client,
    retry: RetrySettings,
}

#[derive(Debug, Serialize)]
struct AcquireBody<'a> {
    email: &'a str,
    scopes: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    delegation_email: Option<&'a str>,
}

impl HttpTokenSource {
    pub fn new(config: &SourceConfig, retry: RetrySettings) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms.unwrap_or(DEFAULT_HTTP_TIMEOUT_MS));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            url: config.url.to_owned(),
            headers: config.headers.to_owned().unwrap_or_default(),
            client,
            retry,
        })
    }

    pub fn from_service_config(config: &ServiceConfig) -> Result<Self> {
        let retry = RetrySettings::from(config.settings.retry.as_ref());
        Self::new(&config.source, retry)
    }

    /// Fetches a token, retrying transient failures with backoff.
    pub async fn fetch_token(&self, request: &TokenRequest) -> Result<Token> {
        self.retry.run_with_retry(|| self.fetch_once(request)).await
    }

    /// Acquisition function to hand to a [`crate::cache::TokenCache`].
    pub fn acquirer(&self) -> impl Fn(TokenRequest) -> BoxFuture<'static, Result<Token, SharedError>> + Clone + Send + Sync + 'static {
        let source = self.clone();
        move |request: TokenRequest| {
            let source = source.clone();
            async move { source.fetch_token(&request).await.map_err(Arc::new) }.boxed()
        }
    }

    async fn fetch_once(&self, request: &TokenRequest) -> Result<Token> {
        let body = AcquireBody {
            email: &request.email,
            scopes: &request.scopes,
            delegation_email: request.delegation_email.as_deref(),
        };

        let mut builder = self.client.post(&self.url).json(&body);
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }

        debug!("requesting token from {}", self.url);
        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("token request failed: {}", response.status()));
        }

        let text = response.text().await?;
        serde_json::from_str::<Token>(&text).context("token response is not valid")
    }
}
