//! Column extraction, sorting, grouping and reindexing.
//!
//! These are the building blocks the dataset transforms are written in.
//! Missing values travel as `None` and only become JSON `null` at the end.

use crate::models::{number_value, ColumnKind, DatasetResult, RawTable};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Sort direction for value-ordered series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A label column paired with a numeric column.
#[derive(Debug, Clone, Default)]
pub struct Series {
    pub labels: Vec<String>,
    pub values: Vec<Option<f64>>,
    /// Whether the source column held integers only.
    pub integral: bool,
}

impl Series {
    /// Extract `label` and `value` columns from every row.
    pub fn from_columns(table: &RawTable, label: &str, value: &str) -> DatasetResult<Self> {
        let label_col = table.column(label)?;
        let value_col = table.column(value)?;

        let mut series = Series {
            integral: ColumnKind::infer(table.rows.iter().map(|r| r[value_col].as_str()))
                == ColumnKind::Integer,
            ..Series::default()
        };
        for row in 0..table.len() {
            series.labels.push(table.text(row, label_col).to_string());
            series.values.push(table.number(row, value_col)?);
        }
        Ok(series)
    }

    /// Stable sort by value. Missing values go last in either direction.
    pub fn sort_by_value(&mut self, order: SortOrder) {
        let mut pairs: Vec<(String, Option<f64>)> = self
            .labels
            .drain(..)
            .zip(self.values.drain(..))
            .collect();

        pairs.sort_by(|(_, a), (_, b)| compare_missing_last(*a, *b, order));

        for (label, value) in pairs {
            self.labels.push(label);
            self.values.push(value);
        }
    }

    /// Labels as a JSON array.
    pub fn labels_json(&self) -> Value {
        Value::from(self.labels.clone())
    }

    /// Values as a JSON array, keeping integers integral.
    pub fn values_json(&self) -> Value {
        Value::Array(
            self.values
                .iter()
                .map(|v| json_number(*v, self.integral))
                .collect(),
        )
    }
}

/// Compare two optional floats, ordering missing values last.
pub fn compare_missing_last(a: Option<f64>, b: Option<f64>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            match order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Render a number, as an integer when the source column was integral.
pub fn json_number(value: Option<f64>, integral: bool) -> Value {
    match value {
        Some(v) if integral && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
            Value::from(v as i64)
        }
        other => number_value(other),
    }
}

/// Running mean that ignores missing values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mean {
    sum: f64,
    count: usize,
    rows: usize,
}

impl Mean {
    pub fn push(&mut self, value: Option<f64>) {
        self.rows += 1;
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    /// No row was pushed at all, missing or not.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// `None` when no value was pushed.
    pub fn get(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Mean of the values per key. Keys whose values are all missing map to `None`.
pub fn group_mean<K, I>(items: I) -> BTreeMap<K, Option<f64>>
where
    K: Ord,
    I: IntoIterator<Item = (K, Option<f64>)>,
{
    let mut groups: BTreeMap<K, Mean> = BTreeMap::new();
    for (key, value) in items {
        groups.entry(key).or_default().push(value);
    }
    groups.into_iter().map(|(k, m)| (k, m.get())).collect()
}

/// Align grouped values onto a fixed axis.
///
/// Positions absent from `groups` get `fill`. A group whose values were
/// all missing stays `None`.
pub fn reindex<K: Ord>(
    groups: &BTreeMap<K, Option<f64>>,
    axis: &[K],
    fill: Option<f64>,
) -> Vec<Option<f64>> {
    axis.iter()
        .map(|key| groups.get(key).map_or(fill, |v| *v))
        .collect()
}

/// Floats as a JSON array, missing as `null`.
pub fn values_json(values: &[Option<f64>]) -> Value {
    Value::Array(values.iter().map(|v| number_value(*v)).collect())
}

/// Interpret a number as a whole value (month, year), if it is one.
pub fn as_whole(value: Option<f64>) -> Option<i64> {
    value
        .filter(|v| v.fract() == 0.0)
        .map(|v| v as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_sort_ascending_missing_last() {
        let t = table(
            &["country", "pct"],
            &[&["A", "80"], &["B", ""], &["C", "40"]],
        );
        let mut series = Series::from_columns(&t, "country", "pct").unwrap();
        series.sort_by_value(SortOrder::Ascending);

        assert_eq!(series.labels, vec!["C", "A", "B"]);
        assert_eq!(series.values_json(), json!([40, 80, null]));
    }

    #[test]
    fn test_sort_descending_missing_last() {
        let t = table(
            &["country", "pct"],
            &[&["A", "NaN"], &["B", "1.5"], &["C", "7.25"]],
        );
        let mut series = Series::from_columns(&t, "country", "pct").unwrap();
        series.sort_by_value(SortOrder::Descending);

        assert_eq!(series.labels, vec!["C", "B", "A"]);
        assert_eq!(series.values_json(), json!([7.25, 1.5, null]));
    }

    #[test]
    fn test_sort_is_stable() {
        let t = table(
            &["country", "pct"],
            &[&["A", "1"], &["B", "1"], &["C", "0"]],
        );
        let mut series = Series::from_columns(&t, "country", "pct").unwrap();
        series.sort_by_value(SortOrder::Descending);
        assert_eq!(series.labels, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_series_rejects_text_values() {
        let t = table(&["country", "pct"], &[&["A", "high"]]);
        assert!(Series::from_columns(&t, "country", "pct").is_err());
    }

    #[test]
    fn test_group_mean_and_reindex() {
        let groups = group_mean(vec![
            ("Good", Some(10.0)),
            ("Good", Some(20.0)),
            ("Poor", None),
            ("Fair", Some(5.0)),
        ]);
        assert_eq!(groups.get("Good"), Some(&Some(15.0)));
        assert_eq!(groups.get("Poor"), Some(&None));

        let axis = ["Good", "Fair", "Moderate", "Poor"];
        assert_eq!(
            reindex(&groups, &axis, Some(0.0)),
            vec![Some(15.0), Some(5.0), Some(0.0), None]
        );
        assert_eq!(
            reindex(&groups, &axis, None),
            vec![Some(15.0), Some(5.0), None, None]
        );
    }

    #[test]
    fn test_mean_tracks_missing_rows() {
        let mut mean = Mean::default();
        assert!(mean.is_empty());
        mean.push(None);
        assert!(!mean.is_empty());
        assert_eq!(mean.get(), None);
        mean.push(Some(4.0));
        mean.push(Some(2.0));
        assert_eq!(mean.get(), Some(3.0));
    }

    #[test]
    fn test_as_whole() {
        assert_eq!(as_whole(Some(3.0)), Some(3));
        assert_eq!(as_whole(Some(3.5)), None);
        assert_eq!(as_whole(None), None);
    }
}
