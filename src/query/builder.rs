use chrono_tz::Tz;
use std::collections::BTreeSet;
use tracing::debug;

use crate::config::TableNames;
use crate::error::{ReportError, ReportResult};
use crate::models::{Dimension, Granularity, QueryParameterSet, DAY_AND_HOUR, PKEY};
use crate::query::ir::{BindValue, Condition, Expr, Join, JoinKind, ReportQuery, TableRole};
use crate::timezone;

/// Kind of user action a conversion is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum ConnectionAction {
    Impression = 0,
    Click = 1,
    Arrival = 2,
    Manual = 4,
}

impl ConnectionAction {
    pub const ALL: [ConnectionAction; 4] = [
        ConnectionAction::Impression,
        ConnectionAction::Click,
        ConnectionAction::Arrival,
        ConnectionAction::Manual,
    ];

    pub fn code(self) -> i64 {
        self as i64
    }

    /// Aggregate column counting approved conversions of this kind
    pub fn column(self) -> String {
        format!("sum_conversions_{}", self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum ConnectionStatus {
    Pending = 2,
    Approved = 4,
}

impl ConnectionStatus {
    pub fn code(self) -> i64 {
        self as i64
    }
}

pub const SUM_CONVERSIONS: &str = "sum_conversions";
pub const SUM_CONVERSIONS_PENDING: &str = "sum_conversions_pending";

fn conn(name: &'static str) -> Expr {
    Expr::column(TableRole::Connection, name)
}

fn status_is(status: ConnectionStatus) -> Condition {
    Condition::Eq(conn("connection_status"), Expr::Int(status.code()))
}

fn action_is(action: ConnectionAction) -> Condition {
    Condition::Eq(conn("connection_action"), Expr::Int(action.code()))
}

/// Builds the conversion aggregate query for a report request
#[derive(Debug, Clone)]
pub struct ReportQueryBuilder {
    tables: TableNames,
    storage_timezone: Tz,
}

impl ReportQueryBuilder {
    pub fn new(tables: TableNames, storage_timezone: Tz) -> Self {
        Self {
            tables,
            storage_timezone,
        }
    }

    pub fn build(
        &self,
        params: &QueryParameterSet,
        granularity: Granularity,
    ) -> ReportResult<ReportQuery> {
        if let (Some(begin), Some(end)) = (params.day_begin, params.day_end) {
            if end < begin {
                return Err(ReportError::InvalidParameter(format!(
                    "day_end {end} is before day_begin {begin}"
                )));
            }
        }

        let mut exclude: BTreeSet<Dimension> = params.exclude.clone();
        let mut query = ReportQuery::new(
            self.tables.name(TableRole::Connection),
            granularity.bucket_method(),
        );

        if granularity.is_entity() {
            let key = match (
                exclude.contains(&Dimension::Ad),
                exclude.contains(&Dimension::Zone),
            ) {
                (false, false) => {
                    Expr::Concat(vec![conn("ad_id"), Expr::Text("_"), conn("zone_id")])
                }
                (false, true) => conn("ad_id"),
                (true, false) => conn("zone_id"),
                (true, true) => {
                    return Err(ReportError::InvalidParameter(
                        "ad_id and zone_id cannot both be excluded from an entity report"
                            .to_string(),
                    ))
                }
            };
            query.select(key, PKEY);
        } else {
            // Ads and zones only make sense as dimensions of entity reports
            exclude.insert(Dimension::Ad);
            exclude.insert(Dimension::Zone);
        }
        let output = |d: Dimension| params.is_requested(d) && !exclude.contains(&d);

        query.select(
            Expr::HourBucket(Box::new(conn("tracker_date_time"))),
            DAY_AND_HOUR,
        );
        query.filter(Condition::Eq(conn("inside_window"), Expr::Int(1)));
        query.group_by(DAY_AND_HOUR);

        for action in ConnectionAction::ALL {
            query.select(
                Expr::CountWhere(vec![status_is(ConnectionStatus::Approved), action_is(action)]),
                &action.column(),
            );
        }
        query.select(
            Expr::CountWhere(vec![status_is(ConnectionStatus::Approved)]),
            SUM_CONVERSIONS,
        );
        query.select(
            Expr::CountWhere(vec![status_is(ConnectionStatus::Pending)]),
            SUM_CONVERSIONS_PENDING,
        );

        if let (Some(begin), Some(end)) = (params.day_begin, params.day_end) {
            let (start, end) = match (begin.and_hms_opt(0, 0, 0), end.and_hms_opt(23, 59, 59)) {
                (Some(s), Some(e)) => (s, e),
                _ => {
                    return Err(ReportError::InvalidParameter(
                        "date window out of range".to_string(),
                    ))
                }
            };
            let start = timezone::convert(start, params.timezone, self.storage_timezone);
            let end = timezone::convert(end, params.timezone, self.storage_timezone);
            query.filter(Condition::Between(
                conn("tracker_date_time"),
                BindValue::Timestamp(start),
                BindValue::Timestamp(end),
            ));
        }

        if let Some(agency_id) = present(params.agency_id) {
            query.join(self.banner_join());
            query.join(self.campaign_join());
            query.join(Join {
                role: TableRole::Client,
                kind: JoinKind::Inner,
                table: self.tables.name(TableRole::Client),
                on: vec![Condition::Eq(
                    Expr::column(TableRole::Client, "clientid"),
                    Expr::column(TableRole::Campaign, "clientid"),
                )],
            });
            query.join(self.zone_join(JoinKind::Left));
            query.join(Join {
                role: TableRole::Affiliate,
                kind: JoinKind::Left,
                table: self.tables.name(TableRole::Affiliate),
                on: vec![
                    Condition::Eq(
                        Expr::column(TableRole::Affiliate, "affiliateid"),
                        Expr::column(TableRole::Zone, "affiliateid"),
                    ),
                    Condition::EqParam(
                        Expr::column(TableRole::Affiliate, "agencyid"),
                        BindValue::Int(agency_id),
                    ),
                ],
            });
            query.filter(Condition::EqParam(
                Expr::column(TableRole::Client, "agencyid"),
                BindValue::Int(agency_id),
            ));
        }

        let advertiser_id = present(params.advertiser_id);
        if advertiser_id.is_some() || params.is_requested(Dimension::Advertiser) {
            query.join(self.banner_join());
            query.join(self.campaign_join());
            if let Some(id) = advertiser_id {
                query.filter(Condition::EqParam(
                    Expr::column(TableRole::Campaign, "clientid"),
                    BindValue::Int(id),
                ));
            }
            if output(Dimension::Advertiser) {
                query.select(
                    Expr::column(TableRole::Campaign, "clientid"),
                    Dimension::Advertiser.column(),
                );
                query.group_by(Dimension::Advertiser.column());
            }
        }

        let placement_id = present(params.placement_id);
        if placement_id.is_some() || params.is_requested(Dimension::Placement) {
            query.join(self.banner_join());
            if let Some(id) = placement_id {
                query.filter(Condition::EqParam(
                    Expr::column(TableRole::Banner, "campaignid"),
                    BindValue::Int(id),
                ));
            }
            if output(Dimension::Placement) {
                query.select(
                    Expr::column(TableRole::Banner, "campaignid"),
                    Dimension::Placement.column(),
                );
                query.group_by(Dimension::Placement.column());
            }
        }

        let publisher_id = present(params.publisher_id);
        if publisher_id.is_some() || params.is_requested(Dimension::Publisher) {
            query.join(self.zone_join(JoinKind::Inner));
            if let Some(id) = publisher_id {
                query.filter(Condition::EqParam(
                    Expr::column(TableRole::Zone, "affiliateid"),
                    BindValue::Int(id),
                ));
            }
            if output(Dimension::Publisher) {
                query.select(
                    Expr::column(TableRole::Zone, "affiliateid"),
                    Dimension::Publisher.column(),
                );
                query.group_by(Dimension::Publisher.column());
            }
        }

        if let Some(id) = present(params.ad_id) {
            query.filter(Condition::EqParam(conn("ad_id"), BindValue::Int(id)));
        }
        if !exclude.contains(&Dimension::Ad) {
            query.select(conn("ad_id"), Dimension::Ad.column());
            query.group_by(Dimension::Ad.column());
        }

        // Zone 0 is a direct selection, so any present value filters
        if let Some(id) = params.zone_id {
            query.filter(Condition::EqParam(conn("zone_id"), BindValue::Int(id)));
        }
        if !exclude.contains(&Dimension::Zone) {
            query.select(conn("zone_id"), Dimension::Zone.column());
            query.group_by(Dimension::Zone.column());
        }

        debug!(
            ?granularity,
            joins = query.joins.len(),
            filters = query.filters.len(),
            "Built conversion query"
        );

        Ok(query)
    }

    fn banner_join(&self) -> Join {
        Join {
            role: TableRole::Banner,
            kind: JoinKind::Inner,
            table: self.tables.name(TableRole::Banner),
            on: vec![Condition::Eq(
                Expr::column(TableRole::Banner, "bannerid"),
                conn("ad_id"),
            )],
        }
    }

    fn campaign_join(&self) -> Join {
        Join {
            role: TableRole::Campaign,
            kind: JoinKind::Inner,
            table: self.tables.name(TableRole::Campaign),
            on: vec![Condition::Eq(
                Expr::column(TableRole::Campaign, "campaignid"),
                Expr::column(TableRole::Banner, "campaignid"),
            )],
        }
    }

    fn zone_join(&self, kind: JoinKind) -> Join {
        Join {
            role: TableRole::Zone,
            kind,
            table: self.tables.name(TableRole::Zone),
            on: vec![Condition::Eq(
                Expr::column(TableRole::Zone, "zoneid"),
                conn("zone_id"),
            )],
        }
    }
}

/// Zero ids mean "no filter" for every entity except zones
fn present(id: Option<i64>) -> Option<i64> {
    id.filter(|v| *v != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BucketMethod;
    use chrono::NaiveDate;

    fn builder() -> ReportQueryBuilder {
        ReportQueryBuilder::new(TableNames::default(), Tz::UTC)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn joins_of(query: &ReportQuery, role: TableRole) -> usize {
        query.joins.iter().filter(|j| j.role == role).count()
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let params = QueryParameterSet::default().with_days(day(2024, 3, 2), day(2024, 3, 1));
        for granularity in [Granularity::ByDay, Granularity::ByEntityPair] {
            let err = builder().build(&params, granularity).unwrap_err();
            assert!(matches!(err, ReportError::InvalidParameter(_)));
        }
    }

    #[test]
    fn test_single_day_range_is_valid() {
        let params = QueryParameterSet::default().with_days(day(2024, 3, 1), day(2024, 3, 1));
        assert!(builder().build(&params, Granularity::ByDay).is_ok());
    }

    #[test]
    fn test_entity_pair_composite_key() {
        let query = builder()
            .build(&QueryParameterSet::default(), Granularity::ByEntityPair)
            .unwrap();

        let keys: Vec<_> = query.select.iter().filter(|s| s.alias == PKEY).collect();
        assert_eq!(keys.len(), 1);
        assert_eq!(
            keys[0].expr,
            Expr::Concat(vec![conn("ad_id"), Expr::Text("_"), conn("zone_id")])
        );
        assert_eq!(query.bucket, BucketMethod::EntityKey);
        assert!(query.select_item("ad_id").is_some());
        assert!(query.select_item("zone_id").is_some());
    }

    #[test]
    fn test_entity_pair_single_identifier_key() {
        let no_zone = QueryParameterSet::default().excluding(Dimension::Zone);
        let query = builder().build(&no_zone, Granularity::ByEntityPair).unwrap();
        assert_eq!(query.select_item(PKEY).unwrap().expr, conn("ad_id"));
        assert!(query.select_item("zone_id").is_none());

        let no_ad = QueryParameterSet::default().excluding(Dimension::Ad);
        let query = builder().build(&no_ad, Granularity::ByEntityPair).unwrap();
        assert_eq!(query.select_item(PKEY).unwrap().expr, conn("zone_id"));
        assert!(query.select_item("ad_id").is_none());
    }

    #[test]
    fn test_entity_pair_both_excluded_is_rejected() {
        let params = QueryParameterSet::default()
            .excluding(Dimension::Ad)
            .excluding(Dimension::Zone);
        let err = builder().build(&params, Granularity::ByEntityPair).unwrap_err();
        assert!(matches!(err, ReportError::InvalidParameter(_)));

        // Outside entity reports the pair is excluded anyway
        assert!(builder().build(&params, Granularity::ByDay).is_ok());
    }

    #[test]
    fn test_history_reports_drop_ad_and_zone() {
        let query = builder()
            .build(&QueryParameterSet::default(), Granularity::ByHour)
            .unwrap();
        assert!(query.select_item(PKEY).is_none());
        assert!(query.select_item("ad_id").is_none());
        assert!(query.select_item("zone_id").is_none());
        assert_eq!(query.group_by, vec![DAY_AND_HOUR.to_string()]);
        assert_eq!(query.bucket, BucketMethod::Hour);
    }

    #[test]
    fn test_aggregates_always_present() {
        let query = builder()
            .build(&QueryParameterSet::default(), Granularity::ByMonth)
            .unwrap();
        let aliases = query.column_aliases();
        assert_eq!(
            aliases,
            vec![
                "day_and_hour",
                "sum_conversions_0",
                "sum_conversions_1",
                "sum_conversions_2",
                "sum_conversions_4",
                "sum_conversions",
                "sum_conversions_pending",
            ]
        );
        assert_eq!(
            query.select_item(SUM_CONVERSIONS_PENDING).unwrap().expr,
            Expr::CountWhere(vec![status_is(ConnectionStatus::Pending)])
        );
        assert_eq!(
            query.filters,
            vec![Condition::Eq(conn("inside_window"), Expr::Int(1))]
        );
    }

    #[test]
    fn test_build_is_idempotent() {
        let params = QueryParameterSet {
            agency_id: Some(3),
            publisher_id: Some(9),
            ..Default::default()
        }
        .with_days(day(2024, 1, 1), day(2024, 1, 31))
        .including(Dimension::Advertiser)
        .including(Dimension::Placement);

        let first = builder().build(&params, Granularity::ByDay).unwrap();
        let second = builder().build(&params, Granularity::ByDay).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_join_deduplication() {
        let params = QueryParameterSet::default()
            .including(Dimension::Advertiser)
            .including(Dimension::Placement);
        let query = builder().build(&params, Granularity::ByDay).unwrap();

        assert_eq!(joins_of(&query, TableRole::Banner), 1);
        assert_eq!(joins_of(&query, TableRole::Campaign), 1);
        assert_eq!(query.joins.len(), 2);
        assert_eq!(
            query.group_by,
            vec!["day_and_hour", "advertiser_id", "placement_id"]
        );
    }

    #[test]
    fn test_agency_chain_takes_precedence() {
        let params = QueryParameterSet {
            agency_id: Some(5),
            advertiser_id: Some(6),
            publisher_id: Some(7),
            ..Default::default()
        };
        let query = builder().build(&params, Granularity::ByDay).unwrap();

        let roles: Vec<_> = query.joins.iter().map(|j| j.role).collect();
        assert_eq!(
            roles,
            vec![
                TableRole::Banner,
                TableRole::Campaign,
                TableRole::Client,
                TableRole::Zone,
                TableRole::Affiliate,
            ]
        );
        let zone = query.joins.iter().find(|j| j.role == TableRole::Zone).unwrap();
        assert_eq!(zone.kind, JoinKind::Left);
        assert!(query.filters.contains(&Condition::EqParam(
            Expr::column(TableRole::Client, "agencyid"),
            BindValue::Int(5)
        )));
        assert!(query.filters.contains(&Condition::EqParam(
            Expr::column(TableRole::Zone, "affiliateid"),
            BindValue::Int(7)
        )));
    }

    #[test]
    fn test_filter_without_include_adds_no_column() {
        let params = QueryParameterSet {
            placement_id: Some(12),
            ..Default::default()
        };
        let query = builder().build(&params, Granularity::ByDay).unwrap();
        assert_eq!(joins_of(&query, TableRole::Banner), 1);
        assert!(query.select_item("placement_id").is_none());
        assert!(query.filters.contains(&Condition::EqParam(
            Expr::column(TableRole::Banner, "campaignid"),
            BindValue::Int(12)
        )));
    }

    #[test]
    fn test_excluded_dimension_still_joins_and_filters() {
        let params = QueryParameterSet {
            publisher_id: Some(4),
            ..Default::default()
        }
        .including(Dimension::Publisher)
        .excluding(Dimension::Publisher);
        let query = builder().build(&params, Granularity::ByDay).unwrap();
        assert_eq!(joins_of(&query, TableRole::Zone), 1);
        assert!(query.select_item("publisher_id").is_none());
        assert!(!query.group_by.contains(&"publisher_id".to_string()));
    }

    #[test]
    fn test_zero_zone_is_a_filter() {
        let direct = QueryParameterSet {
            zone_id: Some(0),
            ..Default::default()
        };
        let query = builder().build(&direct, Granularity::ByEntityPair).unwrap();
        assert!(query
            .filters
            .contains(&Condition::EqParam(conn("zone_id"), BindValue::Int(0))));

        let unfiltered = builder()
            .build(&QueryParameterSet::default(), Granularity::ByEntityPair)
            .unwrap();
        assert_eq!(unfiltered.filters.len(), 1);
    }

    #[test]
    fn test_zero_ad_is_not_a_filter() {
        let params = QueryParameterSet {
            ad_id: Some(0),
            advertiser_id: Some(0),
            ..Default::default()
        };
        let query = builder().build(&params, Granularity::ByDay).unwrap();
        assert_eq!(query.filters.len(), 1);
        assert!(query.joins.is_empty());
    }

    #[test]
    fn test_ad_filter_applies_when_excluded() {
        let params = QueryParameterSet {
            ad_id: Some(42),
            ..Default::default()
        };
        let query = builder().build(&params, Granularity::ByDay).unwrap();
        assert!(query
            .filters
            .contains(&Condition::EqParam(conn("ad_id"), BindValue::Int(42))));
        assert!(query.select_item("ad_id").is_none());
    }

    #[test]
    fn test_date_window_in_storage_timezone() {
        let plus_two: Tz = "Etc/GMT-2".parse().unwrap();
        let params = QueryParameterSet::default()
            .with_days(day(2024, 3, 1), day(2024, 3, 1))
            .with_timezone(plus_two);
        let query = builder().build(&params, Granularity::ByDay).unwrap();

        let expected = Condition::Between(
            conn("tracker_date_time"),
            BindValue::Timestamp(day(2024, 2, 29).and_hms_opt(22, 0, 0).unwrap()),
            BindValue::Timestamp(day(2024, 3, 1).and_hms_opt(21, 59, 59).unwrap()),
        );
        assert!(query.filters.contains(&expected));
    }

    #[test]
    fn test_single_bound_adds_no_window() {
        let params = QueryParameterSet {
            day_begin: Some(day(2024, 3, 1)),
            ..Default::default()
        };
        let query = builder().build(&params, Granularity::ByDay).unwrap();
        assert_eq!(query.filters.len(), 1);
    }
}
