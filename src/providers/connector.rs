use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use url::Url;

use super::encoding;
use super::CiServer;
use crate::error::{BuildLensError, Result};
use crate::models::Build;

const TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches builds from one CI server, one request at a time.
pub struct CiConnector {
    client: Client,
    server: Box<dyn CiServer>,
}

impl CiConnector {
    pub fn new(server: Box<dyn CiServer>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("buildlens/", env!("CARGO_PKG_VERSION")))
            .timeout(TIMEOUT)
            .cookie_store(true)
            .build()
            .map_err(|e| BuildLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self::with_client(server, client))
    }

    pub fn with_client(server: Box<dyn CiServer>, client: Client) -> Self {
        Self { client, server }
    }

    pub fn server(&self) -> &dyn CiServer {
        self.server.as_ref()
    }

    /// Opens a form-login session when the server is configured for one.
    pub async fn login(&self) -> Result<()> {
        let config = self.server.config();
        let Some(credentials) = config.credentials.as_ref().filter(|_| config.uses_form_login())
        else {
            return Ok(());
        };

        let url = self.server.login_url()?;
        debug!("Logging in to {url} as {}", credentials.username);

        let response = self
            .client
            .post(url.clone())
            .form(&[
                ("j_username", credentials.username.as_str()),
                ("j_password", credentials.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(BuildLensError::Api {
                status,
                url: url.to_string(),
            });
        }

        Ok(())
    }

    pub async fn get_last_build(&self) -> Result<Option<Build>> {
        let url = self.server.last_build_url()?;
        self.fetch_build(url).await
    }

    /// Returns `None` when the server does not know the build.
    pub async fn get_build(&self, id: &str) -> Result<Option<Build>> {
        let url = self.server.build_url(id)?;
        self.fetch_build(url).await
    }

    /// Fetches every build started since `since`, with full details.
    ///
    /// Any unexpected status or malformed document aborts the whole fetch.
    pub async fn get_builds_since(&self, since: DateTime<Utc>) -> Result<Vec<Build>> {
        self.login().await?;

        let url = self.server.builds_since_url(since)?;
        let Some(document) = self.execute_get(url).await? else {
            return Ok(Vec::new());
        };

        let cutoff = since.timestamp_millis();
        let mut summaries = self.server.unmarshaller().to_many_model(&document)?;
        summaries.retain(|summary| summary.timestamp == 0 || summary.timestamp >= cutoff);
        info!("Found {} builds since {since}", summaries.len());

        let mut builds = Vec::with_capacity(summaries.len());
        for summary in summaries {
            match self.get_build(&summary.id).await? {
                Some(build) => builds.push(build),
                None => warn!("Build {} disappeared before its details were fetched", summary.id),
            }
        }

        Ok(builds)
    }

    async fn fetch_build(&self, url: Url) -> Result<Option<Build>> {
        let Some(document) = self.execute_get(url).await? else {
            return Ok(None);
        };

        self.server.unmarshaller().to_model(&document).map(Some)
    }

    async fn execute_get(&self, url: Url) -> Result<Option<String>> {
        debug!("GET {url}");

        let mut request = self.client.get(url.clone());
        let config = self.server.config();
        if let Some(credentials) = config.credentials.as_ref().filter(|_| config.uses_basic_auth()) {
            request = request.basic_auth(&credentials.username, Some(credentials.password.as_str()));
        }

        let response = request.send().await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                warn!("Received 404 when trying to access {url}");
                return Ok(None);
            }
            status => {
                return Err(BuildLensError::Api {
                    status,
                    url: url.to_string(),
                })
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await?;

        Ok(Some(encoding::decode(&body, content_type.as_deref())))
    }
}
