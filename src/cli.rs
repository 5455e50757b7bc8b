use anyhow::Result;
use chrono::{Duration, Utc};
use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};
use serde::Serialize;
use std::path::PathBuf;

use crate::error::BuildLensError;
use crate::insights::BuildStabilityInsights;
use crate::providers::connector::CiConnector;
use crate::providers::factory;
use crate::stability::calculate_stability;

#[derive(Parser)]
#[command(name = "buildlens")]
#[command(author, version, about = "CI Build Stability Tool", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output file path (defaults to stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty print JSON output
    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Args)]
struct ConnectionArgs {
    /// CI URL, e.g. "TeamCity:http://teamcity/viewType.html?buildTypeId=Build"
    #[arg(short, long, env = "BUILDLENS_CI_URL")]
    url: Option<String>,

    /// CI system name, when --url is the bare server URL (e.g. "Jenkins")
    #[arg(short, long)]
    system: Option<String>,

    /// Username for the CI server (leave blank for anonymous access)
    #[arg(short = 'U', long, env = "BUILDLENS_USERNAME")]
    username: Option<String>,

    /// Password for the CI server
    #[arg(short = 'P', long, env = "BUILDLENS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Log in through j_security_check instead of HTTP basic auth
    #[arg(long, default_value_t = false)]
    use_jsecuritycheck: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze build stability over the last days
    Analyze {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Number of days to analyze
        #[arg(short, long, default_value_t = 30)]
        days: u32,
    },
    /// Show the most recent build
    LastBuild {
        #[command(flatten)]
        connection: ConnectionArgs,
    },
}

impl ConnectionArgs {
    /// Returns `None` when no CI server is configured or it is not supported.
    fn connector(&self) -> Result<Option<CiConnector>> {
        let Some(url) = self.url.as_deref().filter(|url| !url.trim().is_empty()) else {
            warn!("No CI URL configured, skipping");
            return Ok(None);
        };
        info!("CI URL: {url}");

        let username = self.username.as_deref();
        let password = self.password.as_deref();
        let connector = match &self.system {
            Some(system) => factory::create_for_system(
                system,
                url,
                username,
                password,
                self.use_jsecuritycheck,
            )?,
            None => factory::create(url, username, password, self.use_jsecuritycheck)?,
        };

        if connector.is_none() {
            warn!("Unknown CI system or incorrect URL: {url}");
        }

        Ok(connector)
    }
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Analyze { connection, days } => {
                let Some(connector) = connection.connector()? else {
                    return Ok(());
                };

                let collected_at = Utc::now();
                let since = collected_at
                    .checked_sub_signed(Duration::days(i64::from(*days)))
                    .ok_or_else(|| BuildLensError::Config(format!("Invalid number of days: {days}")))?;

                let builds = connector.get_builds_since(since).await.inspect_err(|e| {
                    error!("Build stability analysis aborted: {e}");
                })?;
                info!("Retrieved {} builds since {since}", builds.len());

                let server = connector.server();
                let insights = BuildStabilityInsights {
                    provider: server.vendor().to_string(),
                    project: server.config().key.clone(),
                    collected_at,
                    days: *days,
                    since,
                    metrics: calculate_stability(&builds),
                };

                Ok(self.write_output(&insights)?)
            }
            Commands::LastBuild { connection } => {
                let Some(connector) = connection.connector()? else {
                    return Ok(());
                };

                connector.login().await?;
                let build = connector.get_last_build().await?;
                if build.is_none() {
                    warn!("No build found for {}", connector.server().config().key);
                }

                Ok(self.write_output(&build)?)
            }
        }
    }

    fn write_output<T: Serialize>(&self, value: &T) -> std::result::Result<(), BuildLensError> {
        let json_output = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)?;
            info!("Results written to: {}", output_path.display());
        } else {
            println!("{json_output}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_defaults_to_thirty_days() {
        let cli = Cli::try_parse_from([
            "buildlens",
            "analyze",
            "--url",
            "TeamCity:http://teamcity/viewType.html?buildTypeId=Build",
        ])
        .unwrap();

        let Commands::Analyze { connection, days } = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(days, 30);
        assert!(!connection.use_jsecuritycheck);
        assert!(!cli.pretty);
    }

    #[test]
    fn test_last_build_with_system_and_credentials() {
        let cli = Cli::try_parse_from([
            "buildlens",
            "last-build",
            "--system",
            "Jenkins",
            "--url",
            "http://jenkins/job/sonar",
            "-U",
            "user",
            "-P",
            "pwd",
            "--use-jsecuritycheck",
            "--pretty",
        ])
        .unwrap();

        let Commands::LastBuild { connection } = cli.command else {
            panic!("expected last-build");
        };
        assert_eq!(connection.system.as_deref(), Some("Jenkins"));
        assert_eq!(connection.username.as_deref(), Some("user"));
        assert!(connection.use_jsecuritycheck);
        assert!(cli.pretty);

        let connector = connection.connector().unwrap().unwrap();
        assert_eq!(connector.server().vendor(), "Jenkins");
        assert!(connector.server().config().uses_form_login());
    }

    fn connection(url: Option<&str>) -> ConnectionArgs {
        ConnectionArgs {
            url: url.map(str::to_string),
            system: None,
            username: None,
            password: None,
            use_jsecuritycheck: false,
        }
    }

    #[test]
    fn test_missing_url_skips_without_error() {
        assert!(connection(None).connector().unwrap().is_none());
        assert!(connection(Some("  ")).connector().unwrap().is_none());
    }

    #[test]
    fn test_unknown_vendor_skips_without_error() {
        let args = connection(Some("Bamboo:http://bamboo/browse/PRJ-PLAN"));

        assert!(args.connector().unwrap().is_none());
    }

    #[test]
    fn test_write_output_to_missing_directory_is_an_io_error() {
        let cli = Cli {
            command: Commands::LastBuild {
                connection: connection(None),
            },
            output: Some(std::env::temp_dir().join("buildlens-missing-dir").join("out.json")),
            pretty: false,
        };

        let error = cli.write_output(&vec![1, 2, 3]).unwrap_err();

        assert!(matches!(error, BuildLensError::Io(_)));
    }

    #[test]
    fn test_write_output_to_file() {
        let path = std::env::temp_dir().join(format!("buildlens-{}.json", std::process::id()));
        let cli = Cli {
            command: Commands::LastBuild {
                connection: connection(None),
            },
            output: Some(path.clone()),
            pretty: false,
        };

        cli.write_output(&vec!["g", "r"]).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"["g","r"]"#);
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn test_analyze_without_url_is_a_no_op() {
        let cli = Cli {
            command: Commands::Analyze {
                connection: connection(None),
                days: 30,
            },
            output: None,
            pretty: false,
        };

        assert!(cli.execute().await.is_ok());
    }
}
