use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a report collapses its hourly buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    ByDay,
    ByMonth,
    ByDayOfWeek,
    ByHour,
    ByEntityPair,
}

/// How the final bucket key is derived from a converted `day_and_hour`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BucketMethod {
    /// Re-format the converted timestamp with a strftime pattern
    Format(&'static str),
    /// Weekday number, 0 = Sunday
    DayOfWeek,
    /// Hour of day, 0-23
    Hour,
    /// Key by the `pkey` column, no timestamp conversion
    EntityKey,
}

impl Granularity {
    pub fn bucket_method(self) -> BucketMethod {
        match self {
            Granularity::ByDay => BucketMethod::Format("%Y-%m-%d"),
            Granularity::ByMonth => BucketMethod::Format("%Y-%m"),
            Granularity::ByDayOfWeek => BucketMethod::DayOfWeek,
            Granularity::ByHour => BucketMethod::Hour,
            Granularity::ByEntityPair => BucketMethod::EntityKey,
        }
    }

    pub fn is_entity(self) -> bool {
        matches!(self, Granularity::ByEntityPair)
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" | "by_day" => Ok(Granularity::ByDay),
            "month" | "by_month" => Ok(Granularity::ByMonth),
            "dow" | "day_of_week" | "by_day_of_week" => Ok(Granularity::ByDayOfWeek),
            "hour" | "by_hour" => Ok(Granularity::ByHour),
            "entity" | "by_entity_pair" => Ok(Granularity::ByEntityPair),
            other => Err(format!(
                "unknown granularity '{other}'. Supported values: day, month, dow, hour, entity"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_granularity() {
        assert_eq!("day".parse::<Granularity>(), Ok(Granularity::ByDay));
        assert_eq!("DOW".parse::<Granularity>(), Ok(Granularity::ByDayOfWeek));
        assert_eq!("entity".parse::<Granularity>(), Ok(Granularity::ByEntityPair));
        assert!("week".parse::<Granularity>().is_err());
    }

    #[test]
    fn test_bucket_methods() {
        assert_eq!(Granularity::ByMonth.bucket_method(), BucketMethod::Format("%Y-%m"));
        assert_eq!(Granularity::ByHour.bucket_method(), BucketMethod::Hour);
        assert_eq!(Granularity::ByEntityPair.bucket_method(), BucketMethod::EntityKey);
    }
}
