use log::{debug, warn};

use super::connector::CiConnector;
use super::jenkins::JenkinsServer;
use super::teamcity::TeamCityServer;
use super::CiServer;
use crate::auth::Credentials;
use crate::error::Result;

type ServerParser = fn(&str, Option<Credentials>, bool) -> Option<Box<dyn CiServer>>;

/// Supported vendors, keyed by the tag used in CI URLs.
const VENDORS: [(&str, ServerParser); 3] = [
    ("TeamCity", teamcity),
    ("Jenkins", jenkins),
    ("Hudson", jenkins),
];

fn teamcity(url: &str, credentials: Option<Credentials>, form: bool) -> Option<Box<dyn CiServer>> {
    boxed(TeamCityServer::parse(url, credentials, form))
}

fn jenkins(url: &str, credentials: Option<Credentials>, form: bool) -> Option<Box<dyn CiServer>> {
    boxed(JenkinsServer::parse(url, credentials, form))
}

fn boxed<S: CiServer + 'static>(server: Option<S>) -> Option<Box<dyn CiServer>> {
    server.map(|server| Box::new(server) as Box<dyn CiServer>)
}

/// Builds a connector from `Vendor:serverUrl`.
///
/// Returns `Ok(None)` for an unknown vendor or malformed URL.
pub fn create(
    ci_url: &str,
    username: Option<&str>,
    password: Option<&str>,
    use_jsecuritycheck: bool,
) -> Result<Option<CiConnector>> {
    let Some((system, url)) = ci_url.split_once(':') else {
        warn!("CI URL '{ci_url}' does not start with a vendor name");
        return Ok(None);
    };

    create_for_system(system, url, username, password, use_jsecuritycheck)
}

pub fn create_for_system(
    system: &str,
    url: &str,
    username: Option<&str>,
    password: Option<&str>,
    use_jsecuritycheck: bool,
) -> Result<Option<CiConnector>> {
    let credentials = Credentials::new(username, password);

    let Some(server) = create_server(system, url, credentials, use_jsecuritycheck) else {
        return Ok(None);
    };

    debug!(
        "Using {} server {} with key {}",
        server.vendor(),
        server.config().host,
        server.config().key
    );

    CiConnector::new(server).map(Some)
}

pub fn create_server(
    system: &str,
    url: &str,
    credentials: Option<Credentials>,
    use_jsecuritycheck: bool,
) -> Option<Box<dyn CiServer>> {
    let system = system.trim();

    let Some((_, parse)) = VENDORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(system))
    else {
        warn!("Unknown CI system: {system}");
        return None;
    };

    let server = parse(url, credentials, use_jsecuritycheck);
    if server.is_none() {
        warn!("Incorrect {system} URL: {url}");
    }

    server
}
