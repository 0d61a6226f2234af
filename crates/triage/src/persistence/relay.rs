use super::{ResponseRecord, ResponseSink, SinkError};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Default upper bound for a single relay attempt.
pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct RelayOptions {
    pub url: String,
    pub timeout: Duration,
    pub token: Option<SecretString>,
}

impl RelayOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_RELAY_TIMEOUT,
            token: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }
}

impl std::fmt::Debug for RelayOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayOptions")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Forwards each record as JSON to a remote endpoint. One attempt, no retries.
#[derive(Debug, Clone)]
pub struct HttpRelay {
    client: Client,
    options: RelayOptions,
}

impl HttpRelay {
    pub fn new(options: RelayOptions) -> Result<Self, SinkError> {
        let client = Client::builder().timeout(options.timeout).build()?;
        Ok(Self { client, options })
    }

    pub fn url(&self) -> &str {
        &self.options.url
    }
}

#[async_trait]
impl ResponseSink for HttpRelay {
    fn name(&self) -> &'static str {
        "relay"
    }

    async fn record(&self, record: &ResponseRecord) -> Result<(), SinkError> {
        let mut request = self.client.post(&self.options.url).json(record);
        if let Some(token) = &self.options.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Rejected {
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}
