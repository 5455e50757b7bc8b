pub mod connector;
mod encoding;
pub mod factory;
pub mod jenkins;
pub mod teamcity;

use chrono::{DateTime, Utc};
use url::Url;

use crate::auth::Credentials;
use crate::error::{BuildLensError, Result};
use crate::models::Build;

/// Maps vendor XML documents to [`Build`] records.
pub trait Unmarshaller: Send + Sync {
    /// Parses one build-detail document.
    fn to_model(&self, document: &str) -> Result<Build>;

    /// Parses a build listing into partially populated builds.
    fn to_many_model(&self, document: &str) -> Result<Vec<Build>>;
}

/// Connection settings shared by every vendor.
#[derive(Debug)]
pub struct ServerConfig {
    pub host: String,
    pub key: String,
    pub credentials: Option<Credentials>,
    pub use_jsecuritycheck: bool,
}

impl ServerConfig {
    /// Requests carry a basic auth header unless the session comes from a form login.
    pub fn uses_basic_auth(&self) -> bool {
        self.credentials.is_some() && !self.use_jsecuritycheck
    }

    pub fn uses_form_login(&self) -> bool {
        self.credentials.is_some() && self.use_jsecuritycheck
    }
}

/// A CI vendor's URL conventions and document format.
pub trait CiServer: Send + Sync {
    fn vendor(&self) -> &'static str;

    fn config(&self) -> &ServerConfig;

    fn last_build_url(&self) -> Result<Url>;

    fn build_url(&self, id: &str) -> Result<Url>;

    fn builds_since_url(&self, since: DateTime<Utc>) -> Result<Url>;

    fn unmarshaller(&self) -> &dyn Unmarshaller;

    fn login_url(&self) -> Result<Url> {
        parse_url(&format!(
            "{}/j_security_check",
            self.config().host.trim_end_matches('/')
        ))
    }
}

pub(crate) fn parse_url(value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| BuildLensError::Config(format!("Invalid URL '{value}': {e}")))
}

