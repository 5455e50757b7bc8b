use chrono::DateTime;
use log::{debug, warn};
use serde::Deserialize;

use crate::error::Result;
use crate::models::Build;
use crate::providers::Unmarshaller;

/// TeamCity date-time format. Example: 20131124T053500+0000
pub const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S%z";

#[derive(Debug, Deserialize)]
struct TeamCityBuildDto {
    #[serde(rename = "@number", default)]
    number: String,
    #[serde(rename = "@status", default)]
    status: String,
    #[serde(rename = "startDate")]
    start_date: Option<String>,
    #[serde(rename = "finishDate")]
    finish_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TeamCityBuildListDto {
    #[serde(rename = "build", default)]
    builds: Vec<TeamCityBuildSummaryDto>,
}

#[derive(Debug, Deserialize)]
struct TeamCityBuildSummaryDto {
    #[serde(rename = "@number", default)]
    number: String,
}

#[derive(Debug, Default)]
pub struct TeamCityBuildUnmarshaller;

impl Unmarshaller for TeamCityBuildUnmarshaller {
    fn to_model(&self, document: &str) -> Result<Build> {
        let dto: TeamCityBuildDto = quick_xml::de::from_str(document)?;
        debug!("Parsing build detail: number: {}", dto.number);

        let start = parse_date(dto.start_date.as_deref());
        let finish = parse_date(dto.finish_date.as_deref());

        let duration_ms = match (start, finish) {
            (Some(start), Some(finish)) => finish - start,
            _ => 0,
        };

        Ok(Build {
            successful: dto.status.eq_ignore_ascii_case("SUCCESS"),
            id: dto.number,
            timestamp: start.unwrap_or(0),
            duration_ms,
            result: dto.status,
        })
    }

    fn to_many_model(&self, document: &str) -> Result<Vec<Build>> {
        let dto: TeamCityBuildListDto = quick_xml::de::from_str(document)?;

        Ok(dto
            .builds
            .into_iter()
            .map(|summary| {
                debug!("Parsing build summary: number: {}", summary.number);
                Build::summary(summary.number)
            })
            .collect())
    }
}

fn parse_date(date: Option<&str>) -> Option<i64> {
    let date = date.map(str::trim).unwrap_or_default();

    match DateTime::parse_from_str(date, DATE_TIME_FORMAT) {
        Ok(parsed) => Some(parsed.timestamp_millis()),
        Err(_) => {
            warn!("Unable to parse date '{date}'. Expected format is yyyyMMdd'T'HHmmssZ");
            None
        }
    }
}
