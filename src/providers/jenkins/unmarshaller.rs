use log::{debug, warn};
use serde::Deserialize;

use crate::error::Result;
use crate::models::Build;
use crate::providers::Unmarshaller;

#[derive(Debug, Deserialize)]
struct JenkinsBuildDto {
    #[serde(default)]
    number: String,
    result: Option<String>,
    timestamp: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JenkinsJobDto {
    #[serde(rename = "build", default)]
    builds: Vec<JenkinsBuildSummaryDto>,
}

#[derive(Debug, Deserialize)]
struct JenkinsBuildSummaryDto {
    #[serde(default)]
    number: String,
    timestamp: Option<String>,
}

/// Reads the `api/xml` documents of a Jenkins (or Hudson) job.
#[derive(Debug, Default)]
pub struct JenkinsBuildUnmarshaller;

impl Unmarshaller for JenkinsBuildUnmarshaller {
    fn to_model(&self, document: &str) -> Result<Build> {
        let dto: JenkinsBuildDto = quick_xml::de::from_str(document)?;
        debug!("Parsing build detail: number: {}", dto.number);

        // Builds still running have no result yet.
        let result = dto.result.unwrap_or_default();
        let timestamp = parse_millis("timestamp", dto.timestamp.as_deref());
        let duration_ms = if timestamp == 0 {
            0
        } else {
            parse_millis("duration", dto.duration.as_deref())
        };

        Ok(Build {
            id: dto.number,
            timestamp,
            duration_ms,
            successful: result.eq_ignore_ascii_case("SUCCESS"),
            result,
        })
    }

    fn to_many_model(&self, document: &str) -> Result<Vec<Build>> {
        let dto: JenkinsJobDto = quick_xml::de::from_str(document)?;

        Ok(dto
            .builds
            .into_iter()
            .map(|summary| {
                debug!("Parsing build summary: number: {}", summary.number);
                Build {
                    timestamp: parse_millis("timestamp", summary.timestamp.as_deref()),
                    ..Build::summary(summary.number)
                }
            })
            .collect())
    }
}

fn parse_millis(field: &str, value: Option<&str>) -> i64 {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return 0;
    };

    match value.parse::<i64>() {
        Ok(millis) if millis >= 0 => millis,
        _ => {
            warn!("Unable to parse {field} '{value}'. Expected a non-negative number of milliseconds");
            0
        }
    }
}
