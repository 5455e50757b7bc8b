use chrono::{DateTime, Utc};
use url::Url;

use super::unmarshaller::{TeamCityBuildUnmarshaller, DATE_TIME_FORMAT};
use crate::auth::Credentials;
use crate::error::{BuildLensError, Result};
use crate::providers::{parse_url, CiServer, ServerConfig, Unmarshaller};

const VIEW_TYPE_PATH: &str = "/viewType.html";
const BUILD_TYPE_PARAM: &str = "buildTypeId";

#[derive(Debug)]
pub struct TeamCityServer {
    config: ServerConfig,
    unmarshaller: TeamCityBuildUnmarshaller,
}

impl TeamCityServer {
    /// Parses `http://host[:port]/viewType.html?buildTypeId=KEY`.
    ///
    /// The host is kept as text so that it is reported exactly as configured.
    pub fn parse(
        url: &str,
        credentials: Option<Credentials>,
        use_jsecuritycheck: bool,
    ) -> Option<Self> {
        let (location, query) = url.trim().split_once('?')?;

        let key = url::form_urlencoded::parse(query.as_bytes())
            .find(|(name, _)| name == BUILD_TYPE_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())?;

        let host = location
            .find(VIEW_TYPE_PATH)
            .map_or(location, |index| &location[..index])
            .trim_end_matches('/');

        if host.is_empty() {
            return None;
        }

        Some(Self {
            config: ServerConfig {
                host: host.to_string(),
                key,
                credentials,
                use_jsecuritycheck,
            },
            unmarshaller: TeamCityBuildUnmarshaller,
        })
    }

    fn auth_scope(&self) -> Option<&'static str> {
        if self.config.uses_form_login() {
            None
        } else if self.config.uses_basic_auth() {
            Some("httpAuth")
        } else {
            Some("guestAuth")
        }
    }

    fn build_type_locator(&self) -> String {
        format!("buildType:(id:{})", self.config.key)
    }

    fn builds_url(&self, locator: Option<&str>) -> Result<Url> {
        let mut url = parse_url(&self.config.host)?;

        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                BuildLensError::Config(format!("Invalid TeamCity host: {}", self.config.host))
            })?;
            segments.pop_if_empty();
            segments.extend(self.auth_scope());
            segments.extend(["app", "rest", "builds"]);
            segments.extend(locator);
        }

        Ok(url)
    }
}

impl CiServer for TeamCityServer {
    fn vendor(&self) -> &'static str {
        "TeamCity"
    }

    fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn last_build_url(&self) -> Result<Url> {
        self.builds_url(Some(&self.build_type_locator()))
    }

    fn build_url(&self, id: &str) -> Result<Url> {
        let locator = format!("{},number:{id}", self.build_type_locator());
        self.builds_url(Some(&locator))
    }

    fn builds_since_url(&self, since: DateTime<Utc>) -> Result<Url> {
        let locator = format!(
            "{},sinceDate:{}",
            self.build_type_locator(),
            since.format(DATE_TIME_FORMAT)
        );

        let mut url = self.builds_url(None)?;
        url.query_pairs_mut().append_pair("locator", &locator);
        Ok(url)
    }

    fn unmarshaller(&self) -> &dyn Unmarshaller {
        &self.unmarshaller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn server(credentials: Option<Credentials>, use_jsecuritycheck: bool) -> TeamCityServer {
        TeamCityServer::parse(
            "http://teamcity:8111/viewType.html?buildTypeId=SonarBuild",
            credentials,
            use_jsecuritycheck,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_host_and_key() {
        let server = TeamCityServer::parse(
            "http://teamcity:port/viewType.html?tab=buildTypeStatusDiv&buildTypeId=SonarBuildStability_Install",
            None,
            false,
        )
        .unwrap();

        assert_eq!(server.config().host, "http://teamcity:port");
        assert_eq!(server.config().key, "SonarBuildStability_Install");
    }

    #[test]
    fn test_parse_keeps_context_path() {
        let server =
            TeamCityServer::parse("https://ci.example.com/tc/viewType.html?buildTypeId=A_B", None, false)
                .unwrap();

        assert_eq!(server.config().host, "https://ci.example.com/tc");
    }

    #[test]
    fn test_parse_without_build_type_is_rejected() {
        assert!(TeamCityServer::parse("http://teamcity/viewType.html", None, false).is_none());
        assert!(TeamCityServer::parse("http://teamcity/viewType.html?tab=x", None, false).is_none());
        assert!(TeamCityServer::parse("http://teamcity/viewType.html?buildTypeId=", None, false).is_none());
        assert!(TeamCityServer::parse("/viewType.html?buildTypeId=A", None, false).is_none());
    }

    #[test]
    fn test_anonymous_urls_use_guest_auth() {
        let server = server(None, false);

        assert_eq!(
            server.build_url("42").unwrap().as_str(),
            "http://teamcity:8111/guestAuth/app/rest/builds/buildType:(id:SonarBuild),number:42"
        );
        assert_eq!(
            server.last_build_url().unwrap().as_str(),
            "http://teamcity:8111/guestAuth/app/rest/builds/buildType:(id:SonarBuild)"
        );
    }

    #[test]
    fn test_basic_auth_urls_use_http_auth() {
        let server = server(Credentials::new(Some("user"), Some("pwd")), false);

        assert_eq!(
            server.build_url("42").unwrap().path(),
            "/httpAuth/app/rest/builds/buildType:(id:SonarBuild),number:42"
        );
    }

    #[test]
    fn test_form_login_urls_have_no_auth_scope() {
        let server = server(Credentials::new(Some("user"), Some("pwd")), true);

        assert_eq!(
            server.build_url("42").unwrap().path(),
            "/app/rest/builds/buildType:(id:SonarBuild),number:42"
        );
        assert_eq!(
            server.login_url().unwrap().as_str(),
            "http://teamcity:8111/j_security_check"
        );
    }

    #[test]
    fn test_build_id_is_escaped_as_one_segment() {
        let server = server(None, false);

        assert_eq!(
            server.build_url("1.0/rc 1").unwrap().path(),
            "/guestAuth/app/rest/builds/buildType:(id:SonarBuild),number:1.0%2Frc%201"
        );
    }

    #[test]
    fn test_builds_since_url_carries_date_locator() {
        let server = server(None, false);
        let since = Utc.with_ymd_and_hms(2013, 11, 24, 5, 35, 0).unwrap();

        let url = server.builds_since_url(since).unwrap();

        assert_eq!(url.path(), "/guestAuth/app/rest/builds");
        let locator = url
            .query_pairs()
            .find(|(name, _)| name == "locator")
            .map(|(_, value)| value.into_owned());
        assert_eq!(
            locator.as_deref(),
            Some("buildType:(id:SonarBuild),sinceDate:20131124T053500+0000")
        );
    }

    #[test]
    fn test_placeholder_port_fails_when_building_urls() {
        let server = TeamCityServer::parse(
            "http://teamcity:port/viewType.html?buildTypeId=SonarBuild",
            None,
            false,
        )
        .unwrap();

        assert!(matches!(
            server.last_build_url(),
            Err(BuildLensError::Config(_))
        ));
    }
}
