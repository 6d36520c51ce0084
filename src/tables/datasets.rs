//! The catalog of dashboard datasets.
//!
//! Each [`DatasetSpec`] names the candidate CSV files backing one chart
//! and the transform that reshapes the loaded table into JSON. The
//! aggregator walks [`DATASETS`] in order; nothing else in the crate
//! knows about individual tables.

use super::reshape::{
    as_whole, group_mean, reindex, values_json, Mean, Series, SortOrder,
};
use crate::models::{number_value, DatasetResult, RawTable};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

const POLLUTANT: &str = "pollutant_name";
const COUNTRY: &str = "country";
const PM25: &str = "PM2.5";
const PM10: &str = "PM10";

/// Fixed ordinal scale for AQI categories, best to worst.
pub const AQI_LABELS: [&str; 6] = [
    "Good",
    "Fair",
    "Moderate",
    "Poor",
    "Very Poor",
    "Extremely Poor",
];

/// Maximum number of rows kept for the worst-episode table.
pub const WORST_EPISODE_LIMIT: usize = 10;

/// Output entries produced by one transform.
pub type Entries = Vec<(&'static str, Value)>;

/// Reshapes a loaded table into one or more output entries.
pub type Reshape = fn(&RawTable) -> DatasetResult<Entries>;

/// Static description of one dataset.
#[derive(Debug, Clone, Copy)]
pub struct DatasetSpec {
    /// Name used in logs; also the output key for single-entry datasets.
    pub key: &'static str,
    /// File names tried in order.
    pub files: &'static [&'static str],
    /// Transform applied to the first file found.
    pub reshape: Reshape,
}

/// Every dataset the dashboard knows about, in output order.
pub const DATASETS: &[DatasetSpec] = &[
    DatasetSpec {
        key: "summary",
        files: &["summary_statistics.csv"],
        reshape: summary,
    },
    DatasetSpec {
        key: "compliance",
        files: &["table_who_compliance.csv"],
        reshape: compliance,
    },
    DatasetSpec {
        key: "monthly_patterns",
        files: &["table_monthly_patterns.csv"],
        reshape: monthly_patterns,
    },
    DatasetSpec {
        key: "aqi",
        files: &["table_seasonal_aqi.csv"],
        reshape: seasonal_aqi,
    },
    DatasetSpec {
        key: "ratio",
        files: &["table6_pm_ratio.csv", "table_pm_ratio.csv"],
        reshape: ratio,
    },
    DatasetSpec {
        key: "model_performance",
        files: &[
            "country_performance_pm25.csv",
            "model_country_performance_pm25.csv",
        ],
        reshape: model_performance,
    },
    DatasetSpec {
        key: "health_risk",
        files: &["table_health_risk_days.csv"],
        reshape: health_risk,
    },
    DatasetSpec {
        key: "mortality",
        files: &["table_excess_mortality_risk.csv"],
        reshape: mortality,
    },
    DatasetSpec {
        key: "yearly_trends",
        files: &["table_yearly_aqi_trends.csv"],
        reshape: yearly_trends,
    },
    DatasetSpec {
        key: "weekend_effect",
        files: &["table_weekend_aqi.csv"],
        reshape: weekend_effect,
    },
    DatasetSpec {
        key: "worst_episodes",
        files: &["table_worst_episodes.csv"],
        reshape: worst_episodes,
    },
];

/// Per-country PM2.5 / PM10 statistics as parallel arrays.
///
/// Countries are the sorted union over both pollutants, so every array
/// has the same length; a country missing one pollutant gets `null`.
fn summary(table: &RawTable) -> DatasetResult<Entries> {
    let table = table.filter_in(POLLUTANT, &[PM25, PM10])?;
    let country = table.column(COUNTRY)?;
    let pollutant = table.column(POLLUTANT)?;

    let mut stats = vec![("mean", table.column("mean")?)];
    for name in ["std", "min", "max"] {
        if let Some(col) = table.optional_column(name) {
            stats.push((name, col));
        }
    }

    let countries: BTreeSet<&str> = (0..table.len()).map(|r| table.text(r, country)).collect();

    let mut out = Map::new();
    out.insert(
        "countries".to_string(),
        Value::from(countries.iter().copied().collect::<Vec<_>>()),
    );

    for (stat, col) in stats {
        let mut items = Vec::with_capacity(table.len());
        for row in 0..table.len() {
            let key = (table.text(row, country), table.text(row, pollutant));
            items.push((key, table.number(row, col)?));
        }
        let means = group_mean(items);

        for (prefix, name) in [("pm25", PM25), ("pm10", PM10)] {
            let values: Vec<Option<f64>> = countries
                .iter()
                .map(|c| means.get(&(*c, name)).copied().flatten())
                .collect();
            out.insert(format!("{}_{}", prefix, stat), values_json(&values));
        }
    }

    Ok(vec![("summary", Value::Object(out))])
}

/// Share of PM2.5 measurements within the WHO guideline, lowest first.
fn compliance(table: &RawTable) -> DatasetResult<Entries> {
    let table = table.filter_eq(POLLUTANT, PM25)?;
    let mut series = Series::from_columns(&table, COUNTRY, "who_compliance_pct")?;
    series.sort_by_value(SortOrder::Ascending);
    Ok(vec![("compliance", parallel(&series, "pct"))])
}

/// PM10 monthly averages per country on a fixed 12-month axis.
fn monthly_patterns(table: &RawTable) -> DatasetResult<Entries> {
    let table = table.filter_eq(POLLUTANT, PM10)?;
    let country = table.column(COUNTRY)?;
    let month = table.column("month_num")?;
    let value = table.column("avg_concentration")?;

    let mut items = Vec::new();
    for row in 0..table.len() {
        let Some(m) = as_whole(table.number(row, month)?).filter(|m| (1..=12).contains(m)) else {
            continue;
        };
        items.push(((table.text(row, country), m), table.number(row, value)?));
    }
    let means = group_mean(items);

    let mut by_country: BTreeMap<&str, BTreeMap<i64, Option<f64>>> = BTreeMap::new();
    for ((c, m), v) in means {
        by_country.entry(c).or_default().insert(m, v);
    }

    let months: Vec<i64> = (1..=12).collect();
    let out: Map<String, Value> = by_country
        .into_iter()
        .map(|(c, series)| (c.to_string(), values_json(&reindex(&series, &months, None))))
        .collect();

    Ok(vec![("monthly_patterns", Value::Object(out))])
}

/// Winter and summer PM2.5 AQI category shares on the fixed label scale.
fn seasonal_aqi(table: &RawTable) -> DatasetResult<Entries> {
    let table = table.filter_eq(POLLUTANT, PM25)?;
    let season = table.column("season_4")?;
    let category = table.column("aqi_category")?;
    let pct = table.column("percentage")?;

    let mut entries = Vec::with_capacity(3);
    for (key, name) in [("aqi_winter", "Winter"), ("aqi_summer", "Summer")] {
        let mut items = Vec::new();
        for row in 0..table.len() {
            if table.text(row, season) == name {
                items.push((table.text(row, category), table.number(row, pct)?));
            }
        }
        let shares = reindex(&group_mean(items), &AQI_LABELS[..], Some(0.0));
        entries.push((key, values_json(&shares)));
    }
    entries.push(("aqi_labels", Value::from(AQI_LABELS.to_vec())));

    Ok(entries)
}

/// PM2.5/PM10 ratio per country, in file order.
fn ratio(table: &RawTable) -> DatasetResult<Entries> {
    let series = Series::from_columns(table, COUNTRY, "mean_ratio")?;
    Ok(vec![("ratio", parallel(&series, "values"))])
}

/// Model evaluation rows, passed through unfiltered.
fn model_performance(table: &RawTable) -> DatasetResult<Entries> {
    Ok(vec![("model_performance", Value::Array(table.to_records()))])
}

/// Share of days above the PM2.5 health threshold, highest first.
fn health_risk(table: &RawTable) -> DatasetResult<Entries> {
    let table = table.filter_eq(POLLUTANT, PM25)?;
    let mut series = Series::from_columns(&table, COUNTRY, "risk_days_pct")?;
    series.sort_by_value(SortOrder::Descending);
    Ok(vec![("health_risk", parallel(&series, "pct"))])
}

/// Average excess mortality risk from PM2.5, highest first.
fn mortality(table: &RawTable) -> DatasetResult<Entries> {
    let table = table.filter_eq(POLLUTANT, PM25)?;
    let mut series = Series::from_columns(&table, COUNTRY, "avg_excess_risk_pct")?;
    series.sort_by_value(SortOrder::Descending);
    Ok(vec![("mortality", parallel(&series, "risk"))])
}

/// PM2.5 AQI per year and country over the union of all years.
fn yearly_trends(table: &RawTable) -> DatasetResult<Entries> {
    let table = table.filter_eq(POLLUTANT, PM25)?;
    let country = table.column(COUNTRY)?;
    let year = table.column("year_num")?;
    let aqi = table.column("avg_aqi")?;

    let mut items = Vec::new();
    for row in 0..table.len() {
        let Some(y) = as_whole(table.number(row, year)?) else {
            continue;
        };
        items.push(((table.text(row, country), y), table.number(row, aqi)?));
    }
    let means = group_mean(items);

    let years: Vec<i64> = means
        .keys()
        .map(|(_, y)| *y)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut by_country: BTreeMap<&str, BTreeMap<i64, Option<f64>>> = BTreeMap::new();
    for ((c, y), v) in means {
        by_country.entry(c).or_default().insert(y, v);
    }

    let data: Map<String, Value> = by_country
        .into_iter()
        .map(|(c, series)| (c.to_string(), values_json(&reindex(&series, &years, Some(0.0)))))
        .collect();

    let mut out = Map::new();
    out.insert("years".to_string(), Value::from(years));
    out.insert("data".to_string(), Value::Object(data));
    Ok(vec![("yearly_trends", Value::Object(out))])
}

/// Mean PM2.5 AQI on weekends vs weekdays, per country in file order.
fn weekend_effect(table: &RawTable) -> DatasetResult<Entries> {
    let table = table.filter_eq(POLLUTANT, PM25)?;
    let country = table.column(COUNTRY)?;
    let flag = table.column("is_weekend")?;
    let aqi = table.column("avg_aqi")?;

    // (weekend, weekday) per country, in order of first appearance
    let mut groups: Vec<(&str, Mean, Mean)> = Vec::new();
    for row in 0..table.len() {
        let c = table.text(row, country);
        let idx = match groups.iter().position(|(name, _, _)| *name == c) {
            Some(idx) => idx,
            None => {
                groups.push((c, Mean::default(), Mean::default()));
                groups.len() - 1
            }
        };
        match table.text(row, flag) {
            "Weekend" => groups[idx].1.push(table.number(row, aqi)?),
            "Weekday" => groups[idx].2.push(table.number(row, aqi)?),
            _ => {}
        }
    }

    let out: Map<String, Value> = groups
        .into_iter()
        .map(|(c, weekend, weekday)| {
            let mut pair = Map::new();
            pair.insert("weekend".to_string(), group_or_zero(&weekend));
            pair.insert("weekday".to_string(), group_or_zero(&weekday));
            (c.to_string(), Value::Object(pair))
        })
        .collect();

    Ok(vec![("weekend_effect", Value::Object(out))])
}

/// The first rows of the worst-episode table.
fn worst_episodes(table: &RawTable) -> DatasetResult<Entries> {
    let records = table.head(WORST_EPISODE_LIMIT).to_records();
    Ok(vec![("worst_episodes", Value::Array(records))])
}

/// `{countries: [...], <value_key>: [...]}`
fn parallel(series: &Series, value_key: &str) -> Value {
    let mut out = Map::new();
    out.insert("countries".to_string(), series.labels_json());
    out.insert(value_key.to_string(), series.values_json());
    Value::Object(out)
}

fn group_or_zero(group: &Mean) -> Value {
    if group.is_empty() {
        Value::from(0)
    } else {
        number_value(group.get())
    }
}
