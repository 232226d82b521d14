//! Report payloads and the sources they are fetched from
use crate::chart::{ChartConfig, ChartConfigError, ChartType, ValueFormat, default_config};
use crate::selector::first_of_month;
use crate::store::{Filters, GroupBy, YMD_FMT};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use time::{Date, Duration};

/// Named metric series sharing one sequence of labels
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ReportPayload {
    pub(crate) labels: Vec<String>,
    pub(crate) series: BTreeMap<String, Vec<f64>>,
    /// Scalar entries such as `total_revenue_growth`
    pub(crate) growth: BTreeMap<String, f64>,
    /// Chart settings declared by the report itself
    pub(crate) charts: BTreeMap<String, ChartConfig>,
    /// Product category of each row; empty if the report does not tag rows
    pub(crate) categories: Vec<String>,
    /// ASIN of each row; empty if the report does not tag rows
    pub(crate) asins: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawPayload {
    labels: Option<Vec<String>>,
    error: Option<String>,
    #[serde(default)]
    category: Vec<String>,
    #[serde(default)]
    asin: Vec<String>,
    #[serde(default)]
    charts: BTreeMap<String, RawChartConfig>,
    #[serde(flatten)]
    rest: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChartConfig {
    label: String,
    #[serde(default = "default_chart_type")]
    chart_type: RawChartType,
    color: Option<String>,
    background_color: Option<String>,
    #[serde(default = "default_value_format")]
    value_format: RawValueFormat,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawChartType {
    Line,
    Bar,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawValueFormat {
    Currency,
    Percentage,
    Number,
}

fn default_chart_type() -> RawChartType {
    RawChartType::Line
}

fn default_value_format() -> RawValueFormat {
    RawValueFormat::Number
}

impl RawChartConfig {
    fn validate(self) -> Result<ChartConfig, ChartConfigError> {
        let chart_type = match self.chart_type {
            RawChartType::Line => ChartType::Line,
            RawChartType::Bar => ChartType::Bar,
        };
        let value_format = match self.value_format {
            RawValueFormat::Currency => ValueFormat::Currency,
            RawValueFormat::Percentage => ValueFormat::Percentage,
            RawValueFormat::Number => ValueFormat::Number,
        };
        let mut config = ChartConfig::new(self.label, chart_type, value_format)?;
        if let Some(color) = self.color {
            config = config.color(&color)?;
        }
        if let Some(bg) = self.background_color {
            config = config.background_color(&bg)?;
        }
        Ok(config)
    }
}

impl ReportPayload {
    /// Parses a flat JSON report object: a `labels` array, one array of
    /// numbers per metric, optional scalar growth figures, and an optional
    /// `charts` object describing how to draw each metric
    pub(crate) fn from_json(src: &str) -> Result<ReportPayload, FetchError> {
        let raw = serde_json::from_str::<RawPayload>(src)
            .map_err(|e| FetchError::DataShape(format!("not a report object: {e}")))?;
        if let Some(msg) = raw.error {
            return Err(FetchError::Server(msg));
        }
        let Some(labels) = raw.labels else {
            return Err(FetchError::DataShape(String::from("missing \"labels\"")));
        };
        for (name, tags) in [("category", &raw.category), ("asin", &raw.asin)] {
            if !tags.is_empty() && tags.len() != labels.len() {
                return Err(FetchError::DataShape(format!(
                    "{name:?} has {} entries for {} labels",
                    tags.len(),
                    labels.len()
                )));
            }
        }
        let mut series = BTreeMap::new();
        let mut growth = BTreeMap::new();
        for (id, value) in raw.rest {
            match value {
                serde_json::Value::Array(items) => {
                    let values = items
                        .iter()
                        .map(serde_json::Value::as_f64)
                        .collect::<Option<Vec<_>>>()
                        .ok_or_else(|| {
                            FetchError::DataShape(format!("series {id:?} contains non-numbers"))
                        })?;
                    if values.len() != labels.len() {
                        return Err(FetchError::DataShape(format!(
                            "series {id:?} has {} values for {} labels",
                            values.len(),
                            labels.len()
                        )));
                    }
                    series.insert(id, values);
                }
                serde_json::Value::Number(n) => {
                    if let Some(n) = n.as_f64() {
                        growth.insert(id, n);
                    }
                }
                _ => log::debug!("Ignoring report field {id:?}"),
            }
        }
        let charts = raw
            .charts
            .into_iter()
            .map(|(id, cfg)| match cfg.validate() {
                Ok(config) => Ok((id, config)),
                Err(e) => Err(FetchError::DataShape(format!("chart {id:?}: {e}"))),
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(ReportPayload {
            labels,
            series,
            growth,
            charts,
            categories: raw.category,
            asins: raw.asin,
        })
    }

    /// The chart configuration for `id`: the report's own if it declares
    /// one, else the built-in default
    pub(crate) fn chart_config(&self, id: &str) -> ChartConfig {
        self.charts
            .get(id)
            .cloned()
            .unwrap_or_else(|| default_config(id))
    }

    pub(crate) fn points(&self) -> usize {
        self.labels.len()
    }

    /// Keeps the rows whose label date and tags pass `filters` and merges
    /// them into one row per day, week, or month.  A non-empty category or
    /// ASIN filter only passes rows tagged with exactly that value.
    fn select(self, filters: &Filters) -> Result<ReportPayload, FetchError> {
        let (start, end) = (filters.range.start(), filters.range.end());
        let mut buckets = BTreeMap::<Date, Vec<usize>>::new();
        for (row, label) in self.labels.iter().enumerate() {
            let date = Date::parse(label, &YMD_FMT).map_err(|e| {
                FetchError::DataShape(format!("label {label:?} is not a date: {e}"))
            })?;
            if start.is_some_and(|s| date < s)
                || end.is_some_and(|e| date > e)
                || !tag_matches(&self.categories, row, &filters.category)
                || !tag_matches(&self.asins, row, &filters.asin)
            {
                continue;
            }
            buckets
                .entry(bucket_start(date, filters.group_by))
                .or_default()
                .push(row);
        }
        let series = self
            .series
            .iter()
            .map(|(id, values)| {
                let average = self.chart_config(id).value_format() == ValueFormat::Percentage;
                let merged = buckets
                    .values()
                    .map(|rows| merge(rows.iter().filter_map(|&r| values.get(r).copied()), average))
                    .collect();
                (id.clone(), merged)
            })
            .collect();
        Ok(ReportPayload {
            labels: buckets.keys().map(Date::to_string).collect(),
            series,
            growth: self.growth,
            charts: self.charts,
            categories: Vec::new(),
            asins: Vec::new(),
        })
    }
}

fn tag_matches(tags: &[String], row: usize, wanted: &str) -> bool {
    wanted.is_empty() || tags.get(row).is_some_and(|t| t == wanted)
}

fn bucket_start(date: Date, group_by: GroupBy) -> Date {
    match group_by {
        GroupBy::Daily => date,
        GroupBy::Weekly => date
            .checked_sub(Duration::days(date.weekday().number_days_from_sunday().into()))
            .unwrap_or(date),
        GroupBy::Monthly => first_of_month(date),
    }
}

fn merge<I: Iterator<Item = f64>>(values: I, average: bool) -> f64 {
    let (sum, count) = values.fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
    if average && count > 0 {
        sum / f64::from(count)
    } else {
        sum
    }
}

#[derive(Debug, Error)]
pub(crate) enum FetchError {
    #[error("could not read report from {location}")]
    Network {
        location: String,
        source: io::Error,
    },
    #[error("report source failed: {0}")]
    Server(String),
    #[error("malformed report: {0}")]
    DataShape(String),
}

/// Something that produces a report for a set of filters
pub(crate) trait ReportSource: fmt::Debug {
    fn fetch(&self, filters: &Filters) -> Result<ReportPayload, FetchError>;
}

/// Serves reports out of a JSON file of daily rows, re-read on every fetch
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub(crate) fn new<P: Into<PathBuf>>(path: P) -> JsonFileSource {
        JsonFileSource { path: path.into() }
    }
}

impl ReportSource for JsonFileSource {
    fn fetch(&self, filters: &Filters) -> Result<ReportPayload, FetchError> {
        log::debug!(
            "Fetching {} for {} grouped {}",
            self.path.display(),
            filters.range,
            filters.group_by
        );
        let src = fs::read_to_string(&self.path).map_err(|source| FetchError::Network {
            location: self.path.display().to_string(),
            source,
        })?;
        ReportPayload::from_json(&src)?.select(filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::DateRange;
    use time::macros::date;

    static DAILY: &str = r##"{
        "labels": ["2024-06-01", "2024-06-02", "2024-06-03", "2024-06-09", "2024-07-01"],
        "total_revenue": [100.0, 50.5, 20, 10, 1],
        "conversion_rate": [2.0, 4.0, 6.0, 1.0, 3.0],
        "total_revenue_growth": 12.5,
        "note": "ignored",
        "charts": {
            "total_revenue": {"label": "Revenue", "chartType": "bar", "color": "#3b82f6", "valueFormat": "currency"}
        }
    }"##;

    fn filters(start: Date, end: Date, group_by: GroupBy) -> Filters {
        Filters {
            range: DateRange::new(start, end).unwrap(),
            group_by,
            category: String::new(),
            asin: String::new(),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_from_json() {
        let payload = ReportPayload::from_json(DAILY).unwrap();
        assert_eq!(payload.points(), 5);
        assert_eq!(payload.series.len(), 2);
        assert!(close(payload.series["total_revenue"][2], 20.0));
        assert!(close(payload.growth["total_revenue_growth"], 12.5));
        let config = payload.chart_config("total_revenue");
        assert_eq!(config.label(), "Revenue");
        assert_eq!(config.chart_type(), ChartType::Bar);
        assert_eq!(
            payload.chart_config("conversion_rate").label(),
            "Conversion Rate"
        );
    }

    #[test]
    fn test_server_error() {
        let err = ReportPayload::from_json(r#"{"error": "store not found"}"#).unwrap_err();
        assert!(matches!(err, FetchError::Server(ref msg) if msg == "store not found"));
    }

    #[test]
    fn test_data_shape_errors() {
        for src in [
            "not json",
            r#"{"total_orders": [1, 2]}"#,
            r#"{"labels": ["2024-06-01"], "total_orders": [1, 2]}"#,
            r#"{"labels": ["2024-06-01"], "total_orders": ["one"]}"#,
            r#"{"labels": 7}"#,
            r#"{"labels": [], "charts": {"x": {"label": ""}}}"#,
            r##"{"labels": [], "charts": {"x": {"label": "X", "color": "#nothex"}}}"##,
            r#"{"labels": [], "charts": {"x": {"label": "X", "valueFormat": "money"}}}"#,
        ] {
            assert!(
                matches!(ReportPayload::from_json(src), Err(FetchError::DataShape(_))),
                "{src}"
            );
        }
    }

    #[test]
    fn test_select_daily_range() {
        let payload = ReportPayload::from_json(DAILY).unwrap();
        let selected = payload
            .select(&filters(date!(2024 - 06 - 02), date!(2024 - 06 - 09), GroupBy::Daily))
            .unwrap();
        assert_eq!(selected.labels, ["2024-06-02", "2024-06-03", "2024-06-09"]);
        assert!(close(selected.series["total_revenue"][0], 50.5));
        assert_eq!(selected.series["conversion_rate"].len(), 3);
    }

    #[test]
    fn test_select_weekly() {
        let payload = ReportPayload::from_json(DAILY).unwrap();
        // June 1st 2024 is a Saturday; the 2nd, 3rd and 9th fall in the next
        // two weeks
        let selected = payload
            .select(&filters(date!(2024 - 06 - 01), date!(2024 - 06 - 30), GroupBy::Weekly))
            .unwrap();
        assert_eq!(selected.labels, ["2024-05-26", "2024-06-02", "2024-06-09"]);
        let revenue = &selected.series["total_revenue"];
        assert!(close(revenue[0], 100.0));
        assert!(close(revenue[1], 70.5));
        assert!(close(revenue[2], 10.0));
        // Percentages are averaged rather than summed
        assert!(close(selected.series["conversion_rate"][1], 5.0));
    }

    #[test]
    fn test_select_monthly() {
        let payload = ReportPayload::from_json(DAILY).unwrap();
        let selected = payload
            .select(&filters(date!(2024 - 01 - 01), date!(2024 - 12 - 31), GroupBy::Monthly))
            .unwrap();
        assert_eq!(selected.labels, ["2024-06-01", "2024-07-01"]);
        assert!(close(selected.series["total_revenue"][0], 180.5));
        assert!(close(selected.series["conversion_rate"][0], 3.25));
    }

    #[test]
    fn test_select_start_only_is_open_ended() {
        let payload = ReportPayload::from_json(DAILY).unwrap();
        let selected = payload
            .select(&Filters {
                range: DateRange::starting(date!(2024 - 06 - 09)),
                ..filters(date!(2024 - 06 - 09), date!(2024 - 06 - 09), GroupBy::Daily)
            })
            .unwrap();
        assert_eq!(selected.labels, ["2024-06-09", "2024-07-01"]);
    }

    #[test]
    fn test_select_by_category_and_asin() {
        let payload = ReportPayload::from_json(
            r#"{
                "labels": ["2024-06-01", "2024-06-01", "2024-06-02", "2024-06-02"],
                "category": ["Kitchen", "Garden", "Kitchen", "Kitchen"],
                "asin": ["B01", "B02", "B01", "B03"],
                "total_orders": [1, 2, 4, 8]
            }"#,
        )
        .unwrap();
        assert_eq!(payload.categories.len(), 4);
        let june = filters(date!(2024 - 06 - 01), date!(2024 - 06 - 30), GroupBy::Daily);
        let all = payload.clone().select(&june).unwrap();
        assert_eq!(all.series["total_orders"], [3.0, 12.0]);
        let kitchen = Filters {
            category: String::from("Kitchen"),
            ..june.clone()
        };
        let selected = payload.clone().select(&kitchen).unwrap();
        assert_eq!(selected.labels, ["2024-06-01", "2024-06-02"]);
        assert_eq!(selected.series["total_orders"], [1.0, 12.0]);
        let b03 = Filters {
            asin: String::from("B03"),
            ..kitchen
        };
        let selected = payload.clone().select(&b03).unwrap();
        assert_eq!(selected.labels, ["2024-06-02"]);
        assert_eq!(selected.series["total_orders"], [8.0]);
        // Untagged reports have no rows for a specific category
        let untagged = ReportPayload::from_json(DAILY).unwrap();
        let selected = untagged.select(&Filters {
            category: String::from("Kitchen"),
            ..june
        });
        assert!(selected.unwrap().labels.is_empty());
    }

    #[test]
    fn test_mistagged_rows_rejected() {
        let src = r#"{"labels": ["2024-06-01", "2024-06-02"], "asin": ["B01"]}"#;
        assert!(matches!(
            ReportPayload::from_json(src),
            Err(FetchError::DataShape(_))
        ));
    }

    #[test]
    fn test_bad_label_date() {
        let payload =
            ReportPayload::from_json(r#"{"labels": ["June 1"], "total_orders": [1]}"#).unwrap();
        assert!(matches!(
            payload.select(&Filters::default_for(date!(2024 - 06 - 20))),
            Err(FetchError::DataShape(_))
        ));
    }

    #[test]
    fn test_file_source() {
        let path = std::env::temp_dir().join(format!("rangepick-{}-report.json", std::process::id()));
        fs::write(&path, DAILY).unwrap();
        let source = JsonFileSource::new(&path);
        let payload = source
            .fetch(&filters(date!(2024 - 06 - 01), date!(2024 - 06 - 03), GroupBy::Daily))
            .unwrap();
        assert_eq!(payload.points(), 3);
        fs::remove_file(&path).unwrap();
        assert!(matches!(
            source.fetch(&Filters::default_for(date!(2024 - 06 - 20))),
            Err(FetchError::Network { .. })
        ));
    }
}
