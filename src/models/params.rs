use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ReportError;

/// Identifier columns a report can include or exclude
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    Advertiser,
    Placement,
    Publisher,
    Ad,
    Zone,
}

impl Dimension {
    /// Output column name of the dimension
    pub fn column(self) -> &'static str {
        match self {
            Dimension::Advertiser => "advertiser_id",
            Dimension::Placement => "placement_id",
            Dimension::Publisher => "publisher_id",
            Dimension::Ad => "ad_id",
            Dimension::Zone => "zone_id",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Dimension {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "advertiser_id" | "advertiserId" => Ok(Dimension::Advertiser),
            "placement_id" | "placementId" => Ok(Dimension::Placement),
            "publisher_id" | "publisherId" => Ok(Dimension::Publisher),
            "ad_id" | "adId" => Ok(Dimension::Ad),
            "zone_id" | "zoneId" => Ok(Dimension::Zone),
            other => Err(ReportError::InvalidParameter(format!(
                "unknown dimension '{other}'"
            ))),
        }
    }
}

/// Validated parameters of one report request
///
/// Entity filters are `None` when absent. Except for `zone_id`, a zero id
/// is treated as absent by the query builder; `Some(0)` on `zone_id` selects
/// direct deliveries and is a real filter.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParameterSet {
    pub day_begin: Option<NaiveDate>,
    pub day_end: Option<NaiveDate>,
    pub agency_id: Option<i64>,
    pub advertiser_id: Option<i64>,
    pub placement_id: Option<i64>,
    pub publisher_id: Option<i64>,
    pub ad_id: Option<i64>,
    pub zone_id: Option<i64>,
    pub include: BTreeSet<Dimension>,
    pub exclude: BTreeSet<Dimension>,
    /// Timezone the report is expressed in
    pub timezone: Tz,
}

impl Default for QueryParameterSet {
    fn default() -> Self {
        Self {
            day_begin: None,
            day_end: None,
            agency_id: None,
            advertiser_id: None,
            placement_id: None,
            publisher_id: None,
            ad_id: None,
            zone_id: None,
            include: BTreeSet::new(),
            exclude: BTreeSet::new(),
            timezone: Tz::UTC,
        }
    }
}

impl QueryParameterSet {
    pub fn with_days(mut self, begin: NaiveDate, end: NaiveDate) -> Self {
        self.day_begin = Some(begin);
        self.day_end = Some(end);
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn including(mut self, dimension: Dimension) -> Self {
        self.include.insert(dimension);
        self
    }

    pub fn excluding(mut self, dimension: Dimension) -> Self {
        self.exclude.insert(dimension);
        self
    }

    pub fn is_excluded(&self, dimension: Dimension) -> bool {
        self.exclude.contains(&dimension)
    }

    pub fn is_requested(&self, dimension: Dimension) -> bool {
        self.include.contains(&dimension)
    }

    /// Requested as an output column and not excluded
    pub fn is_output(&self, dimension: Dimension) -> bool {
        self.is_requested(dimension) && !self.is_excluded(dimension)
    }
}

/// Raw report request as it arrives from a form or the command line
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportRequest {
    pub day_begin: Option<String>,
    pub day_end: Option<String>,
    pub agency_id: Option<String>,
    pub advertiser_id: Option<String>,
    pub placement_id: Option<String>,
    pub publisher_id: Option<String>,
    pub ad_id: Option<String>,
    pub zone_id: Option<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    pub timezone: Option<String>,
}

impl TryFrom<ReportRequest> for QueryParameterSet {
    type Error = ReportError;

    fn try_from(request: ReportRequest) -> Result<Self, Self::Error> {
        let include = request
            .include
            .iter()
            .map(|d| d.parse())
            .collect::<Result<BTreeSet<_>, _>>()?;
        let exclude = request
            .exclude
            .iter()
            .map(|d| d.parse())
            .collect::<Result<BTreeSet<_>, _>>()?;

        let timezone = match blank_to_none(request.timezone.as_deref()) {
            Some(name) => name.parse::<Tz>().map_err(|_| {
                ReportError::InvalidParameter(format!("unknown timezone '{name}'"))
            })?,
            None => Tz::UTC,
        };

        Ok(Self {
            day_begin: parse_day("day_begin", request.day_begin.as_deref())?,
            day_end: parse_day("day_end", request.day_end.as_deref())?,
            agency_id: parse_id("agency_id", request.agency_id.as_deref())?,
            advertiser_id: parse_id("advertiser_id", request.advertiser_id.as_deref())?,
            placement_id: parse_id("placement_id", request.placement_id.as_deref())?,
            publisher_id: parse_id("publisher_id", request.publisher_id.as_deref())?,
            ad_id: parse_id("ad_id", request.ad_id.as_deref())?,
            zone_id: parse_id("zone_id", request.zone_id.as_deref())?,
            include,
            exclude,
            timezone,
        })
    }
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_day(name: &str, value: Option<&str>) -> Result<Option<NaiveDate>, ReportError> {
    blank_to_none(value)
        .map(|v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d").map_err(|_| {
                ReportError::InvalidParameter(format!("{name} must be YYYY-MM-DD, got '{v}'"))
            })
        })
        .transpose()
}

fn parse_id(name: &str, value: Option<&str>) -> Result<Option<i64>, ReportError> {
    blank_to_none(value)
        .map(|v| match v.parse::<i64>() {
            Ok(id) if id >= 0 => Ok(id),
            _ => Err(ReportError::InvalidParameter(format!(
                "{name} must be a non-negative integer, got '{v}'"
            ))),
        })
        .transpose()
}
