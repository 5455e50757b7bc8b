use chrono::{DateTime, Utc};
use url::Url;

use super::unmarshaller::JenkinsBuildUnmarshaller;
use crate::auth::Credentials;
use crate::error::{BuildLensError, Result};
use crate::providers::{parse_url, CiServer, ServerConfig, Unmarshaller};

const JOB_PATH: &str = "/job/";
const BUILDS_TREE: &str = "builds[number,timestamp]";

#[derive(Debug)]
pub struct JenkinsServer {
    config: ServerConfig,
    unmarshaller: JenkinsBuildUnmarshaller,
}

impl JenkinsServer {
    /// Parses `http://host/job/NAME`. Folder jobs (`job/a/job/b`) keep the
    /// whole path after the first `/job/` as their key.
    pub fn parse(
        url: &str,
        credentials: Option<Credentials>,
        use_jsecuritycheck: bool,
    ) -> Option<Self> {
        let location = url.trim().split(['?', '#']).next().unwrap_or_default();
        let (host, job) = location.split_once(JOB_PATH)?;

        let host = host.trim_end_matches('/');
        let key = job.trim_matches('/');
        if host.is_empty() || key.is_empty() {
            return None;
        }

        Some(Self {
            config: ServerConfig {
                host: host.to_string(),
                key: key.to_string(),
                credentials,
                use_jsecuritycheck,
            },
            unmarshaller: JenkinsBuildUnmarshaller,
        })
    }

    /// Appends `segments` below the job path, each escaped as one segment.
    fn job_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = parse_url(&self.config.host)?;

        {
            let mut path = url.path_segments_mut().map_err(|()| {
                BuildLensError::Config(format!("Invalid Jenkins host: {}", self.config.host))
            })?;
            path.pop_if_empty();
            path.push("job");
            path.extend(self.config.key.split('/'));
            path.extend(segments);
        }

        Ok(url)
    }
}

impl CiServer for JenkinsServer {
    fn vendor(&self) -> &'static str {
        "Jenkins"
    }

    fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn last_build_url(&self) -> Result<Url> {
        self.job_url(&["lastBuild", "api", "xml"])
    }

    fn build_url(&self, id: &str) -> Result<Url> {
        self.job_url(&[id, "api", "xml"])
    }

    // Jenkins cannot filter by date, the connector drops older summaries.
    fn builds_since_url(&self, _since: DateTime<Utc>) -> Result<Url> {
        let mut url = self.job_url(&["api", "xml"])?;
        url.query_pairs_mut().append_pair("tree", BUILDS_TREE);
        Ok(url)
    }

    fn unmarshaller(&self) -> &dyn Unmarshaller {
        &self.unmarshaller
    }
}
