//! One compute function per dashboard view.
//!
//! Every view checks its required columns through [`data::require_columns`] before
//! touching the frame, and none of them mutate it.

use crate::data::{self, DIAGNOSIS_LABEL, LYVE1, STAGE};
use crate::error::{DashboardError, Result};
use crate::models::{Diagnosis, View};
use crate::stats::{self, BoxSummary, Describe, Histogram};
use polars::prelude::*;

pub const HISTOGRAM_BINS: usize = 20;

pub enum ViewOutput {
    Overview(Overview),
    Summary(Vec<ColumnSummary>),
    Missing(Vec<MissingCount>),
    Distribution(Distribution),
    Correlation(CorrelationMatrix),
    Grouped(GroupedBoxes),
}

pub struct Overview {
    pub rows: usize,
    pub columns: usize,
    pub header: Vec<String>,
    pub head: Vec<Vec<String>>,
    pub info: Vec<ColumnInfo>,
}

pub struct ColumnInfo {
    pub name: String,
    pub dtype: String,
    pub non_null: usize,
}

pub struct ColumnSummary {
    pub name: String,
    pub stats: Describe,
}

pub struct MissingCount {
    pub name: String,
    pub missing: usize,
}

pub struct Distribution {
    pub column: String,
    /// `None` when the column has no non-null values.
    pub histogram: Option<Histogram>,
    pub dropped: usize,
}

pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    /// Row-major; `None` where the coefficient is undefined.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row)?.get(col).copied().flatten()
    }
}

pub struct BoxGroup {
    pub label: String,
    pub count: usize,
    pub summary: BoxSummary,
}

pub struct GroupedBoxes {
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub groups: Vec<BoxGroup>,
}

impl GroupedBoxes {
    pub fn total(&self) -> usize {
        self.groups.iter().map(|g| g.count).sum()
    }
}

pub fn compute(
    view: View,
    df: &DataFrame,
    selected_column: Option<&str>,
    preview_rows: usize,
) -> Result<ViewOutput> {
    data::require_columns(df, view.required_columns())?;
    tracing::debug!("Computing {:?}", view);

    Ok(match view {
        View::Overview => ViewOutput::Overview(overview(df, preview_rows)?),
        View::SummaryStatistics => ViewOutput::Summary(summary_statistics(df)?),
        View::MissingValues => ViewOutput::Missing(missing_values(df)?),
        View::Distribution => {
            let column = selected_column.ok_or(DashboardError::NoColumnSelected)?;
            ViewOutput::Distribution(distribution(df, column)?)
        }
        View::CorrelationHeatmap => ViewOutput::Correlation(correlation(df)?),
        View::AgeByDiagnosis => ViewOutput::Grouped(by_diagnosis(
            df,
            data::AGE,
            "Age Distribution by Diagnosis",
            "Age",
        )?),
        View::Ca19_9ByDiagnosis => ViewOutput::Grouped(by_diagnosis(
            df,
            data::PLASMA_CA19_9,
            "CA19-9 Levels by Diagnosis",
            "CA19-9 Levels",
        )?),
        View::Lyve1ByStage => ViewOutput::Grouped(lyve1_by_stage(df)?),
    })
}

fn cell_text(value: AnyValue) -> String {
    match value {
        AnyValue::Null => "NaN".to_string(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => other.to_string(),
    }
}

pub fn overview(df: &DataFrame, preview_rows: usize) -> Result<Overview> {
    let header = data::column_names(df);
    let shown = preview_rows.min(df.height());

    let mut head = Vec::with_capacity(shown);
    for row in 0..shown {
        let mut cells = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            cells.push(cell_text(column.get(row)?));
        }
        head.push(cells);
    }

    let mut info = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let name = column.name().to_string();
        let missing = data::missing_count(df, &name)?;
        info.push(ColumnInfo {
            dtype: column.dtype().to_string(),
            non_null: df.height() - missing,
            name,
        });
    }

    Ok(Overview {
        rows: df.height(),
        columns: df.width(),
        header,
        head,
        info,
    })
}

pub fn summary_statistics(df: &DataFrame) -> Result<Vec<ColumnSummary>> {
    data::numeric_columns(df)
        .into_iter()
        .map(|name| {
            let values = data::non_null_values(df, &name)?;
            Ok(ColumnSummary {
                stats: stats::describe(&values),
                name,
            })
        })
        .collect()
}

pub fn missing_values(df: &DataFrame) -> Result<Vec<MissingCount>> {
    data::column_names(df)
        .into_iter()
        .map(|name| {
            let missing = data::missing_count(df, &name)?;
            Ok(MissingCount { name, missing })
        })
        .collect()
}

pub fn distribution(df: &DataFrame, column: &str) -> Result<Distribution> {
    data::require_columns(df, &[column])?;
    let values = data::float_values(df, column)?;
    let present: Vec<f64> = values.iter().flatten().copied().collect();

    Ok(Distribution {
        column: column.to_string(),
        histogram: stats::histogram(&present, HISTOGRAM_BINS),
        dropped: values.len() - present.len(),
    })
}

pub fn correlation(df: &DataFrame) -> Result<CorrelationMatrix> {
    let labels = data::numeric_columns(df);
    let columns = labels
        .iter()
        .map(|name| data::float_values(df, name))
        .collect::<Result<Vec<_>>>()?;

    let values = columns
        .iter()
        .map(|x| columns.iter().map(|y| stats::pearson(x, y)).collect())
        .collect();

    Ok(CorrelationMatrix { labels, values })
}

fn box_group(label: String, values: &[f64]) -> Option<BoxGroup> {
    Some(BoxGroup {
        summary: stats::box_summary(values)?,
        count: values.len(),
        label,
    })
}

/// Boxes of `value_column` per diagnosis label, ordered by diagnosis code.
/// Rows without a recognised diagnosis are left out.
pub fn by_diagnosis(
    df: &DataFrame,
    value_column: &str,
    title: &'static str,
    y_label: &'static str,
) -> Result<GroupedBoxes> {
    let labeled = data::with_diagnosis_label(df)?;

    let mut groups = Vec::with_capacity(Diagnosis::ALL.len());
    for diagnosis in Diagnosis::ALL {
        let mask = data::key_mask(&labeled, DIAGNOSIS_LABEL, diagnosis.label())?;
        let values = data::non_null_values(&labeled.filter(&mask)?, value_column)?;
        groups.extend(box_group(diagnosis.label().to_string(), &values));
    }

    Ok(GroupedBoxes {
        title,
        x_label: "Diagnosis",
        y_label,
        groups,
    })
}

/// LYVE1 boxes per stage, restricted to pancreatic cancer rows.
pub fn lyve1_by_stage(df: &DataFrame) -> Result<GroupedBoxes> {
    let cancer_rows = df.filter(&data::diagnosis_mask(df, Diagnosis::PancreaticCancer)?)?;

    let mut groups = Vec::new();
    for stage in data::group_keys(&cancer_rows, STAGE)? {
        let mask = data::key_mask(&cancer_rows, STAGE, &stage)?;
        let values = data::non_null_values(&cancer_rows.filter(&mask)?, LYVE1)?;
        groups.extend(box_group(stage, &values));
    }

    Ok(GroupedBoxes {
        title: "LYVE1 Levels by Cancer Stage",
        x_label: "Stage",
        y_label: "LYVE1 Levels",
        groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> DataFrame {
        df!(
            "sample_id" => ["S1", "S2", "S3", "S4", "S5", "S6", "S7"],
            "diagnosis" => [1i64, 1, 2, 2, 3, 3, 3],
            "age" => [Some(33i64), Some(45), Some(81), None, Some(51), Some(61), Some(70)],
            "stage" => [None, Some("I"), None, None, Some("IB"), Some("III"), Some("IB")],
            "plasma_CA19_9" => [Some(11.7), None, Some(7.0), Some(8.0), Some(130.0), Some(400.0), Some(220.0)],
            "LYVE1" => [0.89, 2.04, 0.5, 1.3, 5.13, 3.2, 7.0],
        )
        .unwrap()
    }

    fn without(df: &DataFrame, columns: &[&str]) -> DataFrame {
        let mut out = df.clone();
        for name in columns {
            out = out.drop(name).unwrap();
        }
        out
    }

    fn is_missing(result: &Result<ViewOutput>, expected: &[&str]) -> bool {
        match result {
            Err(DashboardError::MissingColumns { missing }) => missing == expected,
            _ => false,
        }
    }

    fn compute_all(df: &DataFrame) -> Vec<(View, Result<ViewOutput>)> {
        View::ALL
            .iter()
            .map(|&view| (view, compute(view, df, Some("age"), 5)))
            .collect()
    }

    #[test]
    fn test_all_views_succeed_on_complete_data() {
        for (view, result) in compute_all(&markers()) {
            assert!(result.is_ok(), "{:?} failed", view);
        }
    }

    #[test]
    fn test_missing_columns_disable_only_dependent_views() {
        let cases: [(View, &[&str]); 3] = [
            (View::AgeByDiagnosis, &["age"]),
            (View::Ca19_9ByDiagnosis, &["plasma_CA19_9"]),
            (View::Lyve1ByStage, &["stage", "LYVE1"]),
        ];
        for (target, dropped) in cases {
            let df = without(&markers(), dropped);
            for (view, result) in compute_all(&df) {
                if view == target {
                    assert!(is_missing(&result, dropped), "{:?} should be guarded", view);
                } else if view == View::Distribution && dropped.contains(&"age") {
                    // the histogram is pointed at "age" in these runs
                    assert!(is_missing(&result, &["age"]));
                } else {
                    assert!(result.is_ok(), "{:?} affected by dropping {:?}", view, dropped);
                }
            }
        }
    }

    #[test]
    fn test_missing_diagnosis_guards_all_grouped_views() {
        let df = without(&markers(), &["diagnosis"]);
        for view in [View::AgeByDiagnosis, View::Ca19_9ByDiagnosis, View::Lyve1ByStage] {
            let result = compute(view, &df, None, 5);
            assert!(is_missing(&result, &["diagnosis"]), "{:?}", view);
        }
        assert!(compute(View::CorrelationHeatmap, &df, None, 5).is_ok());
    }

    #[test]
    fn test_overview_shape_and_head() {
        let o = overview(&markers(), 5).unwrap();
        assert_eq!((o.rows, o.columns), (7, 6));
        assert_eq!(o.head.len(), 5);
        assert_eq!(o.head[0][0], "S1");
        assert_eq!(o.head[0][3], "NaN");
        let age = o.info.iter().find(|c| c.name == "age").unwrap();
        assert_eq!(age.non_null, 6);

        assert_eq!(overview(&markers(), 50).unwrap().head.len(), 7);
    }

    #[test]
    fn test_summary_covers_numeric_columns_only() {
        let summary = summary_statistics(&markers()).unwrap();
        let names: Vec<&str> = summary.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["diagnosis", "age", "plasma_CA19_9", "LYVE1"]);
        let ca = &summary[2].stats;
        assert_eq!(ca.count, 6);
        assert_eq!(ca.max, Some(400.0));
    }

    #[test]
    fn test_missing_values_per_column() {
        let counts: Vec<(String, usize)> = missing_values(&markers())
            .unwrap()
            .into_iter()
            .map(|m| (m.name, m.missing))
            .collect();
        assert_eq!(counts[2], ("age".to_string(), 1));
        assert_eq!(counts[3], ("stage".to_string(), 3));
        assert_eq!(counts[4], ("plasma_CA19_9".to_string(), 1));
        assert_eq!(counts[5], ("LYVE1".to_string(), 0));
    }

    #[test]
    fn test_distribution_drops_nulls() {
        let d = distribution(&markers(), "plasma_CA19_9").unwrap();
        assert_eq!(d.dropped, 1);
        let h = d.histogram.unwrap();
        assert_eq!(h.counts.len(), HISTOGRAM_BINS);
        assert_eq!(h.total(), 6);
    }

    #[test]
    fn test_distribution_of_all_null_column() {
        let df = df!("x" => [None::<f64>, None]).unwrap();
        let d = distribution(&df, "x").unwrap();
        assert!(d.histogram.is_none());
        assert_eq!(d.dropped, 2);
    }

    #[test]
    fn test_distribution_requires_selection() {
        assert!(matches!(
            compute(View::Distribution, &markers(), None, 5),
            Err(DashboardError::NoColumnSelected)
        ));
    }

    #[test]
    fn test_correlation_matrix_is_symmetric() {
        let m = correlation(&markers()).unwrap();
        assert_eq!(m.labels, vec!["diagnosis", "age", "plasma_CA19_9", "LYVE1"]);
        for i in 0..m.labels.len() {
            assert!((m.get(i, i).unwrap() - 1.0).abs() < 1e-9);
            for j in 0..m.labels.len() {
                assert_eq!(m.get(i, j), m.get(j, i));
            }
        }
    }

    #[test]
    fn test_by_diagnosis_orders_groups_by_code() {
        let b = by_diagnosis(&markers(), "age", "t", "Age").unwrap();
        let labels: Vec<&str> = b.groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Healthy", "Benign Disease", "Pancreatic Cancer"]);
        assert_eq!(b.groups[1].count, 1);
        assert_eq!(b.total(), 6);
    }

    #[test]
    fn test_by_diagnosis_skips_unknown_codes() {
        let df = df!("diagnosis" => [1i64, 7, 7], "age" => [30.0, 40.0, 50.0]).unwrap();
        let b = by_diagnosis(&df, "age", "t", "Age").unwrap();
        assert_eq!(b.groups.len(), 1);
        assert_eq!(b.groups[0].label, "Healthy");
    }

    #[test]
    fn test_ca19_9_groups_drop_null_values() {
        let b = by_diagnosis(&markers(), "plasma_CA19_9", "t", "CA19-9 Levels").unwrap();
        let counts: Vec<(&str, usize)> = b
            .groups
            .iter()
            .map(|g| (g.label.as_str(), g.count))
            .collect();
        assert_eq!(
            counts,
            vec![("Healthy", 1), ("Benign Disease", 2), ("Pancreatic Cancer", 3)]
        );
        assert_eq!(b.groups[2].summary.median, 220.0);
    }

    #[test]
    fn test_infinite_values_are_dropped() {
        let df = df!(
            "diagnosis" => [1i64, 1, 1, 1],
            "LYVE1" => [Some(1.0), Some(2.0), Some(f64::INFINITY), None],
        )
        .unwrap();

        let d = distribution(&df, "LYVE1").unwrap();
        assert_eq!(d.dropped, 2);
        let h = d.histogram.unwrap();
        assert!(h.edges.iter().all(|e| e.is_finite()));
        assert_eq!(h.total(), 2);

        let b = by_diagnosis(&df, "LYVE1", "t", "LYVE1").unwrap();
        assert_eq!(b.groups[0].count, 2);
        assert_eq!(b.groups[0].summary.upper_whisker, 2.0);
    }

    #[test]
    fn test_lyve1_numeric_stages_sort_by_value() {
        let df = df!(
            "diagnosis" => [3i64, 3, 3, 1],
            "stage" => [2i64, 10, 2, 10],
            "LYVE1" => [1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();
        let b = lyve1_by_stage(&df).unwrap();
        let groups: Vec<(&str, usize)> = b
            .groups
            .iter()
            .map(|g| (g.label.as_str(), g.count))
            .collect();
        assert_eq!(groups, vec![("2", 2), ("10", 1)]);
    }

    #[test]
    fn test_lyve1_by_stage_uses_cancer_rows_only() {
        let b = lyve1_by_stage(&markers()).unwrap();
        let labels: Vec<&str> = b.groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["IB", "III"]);
        assert_eq!(b.total(), 3);
        assert_eq!(b.groups[0].count, 2);
        assert_eq!(b.groups[0].summary.lower_whisker, 5.13);
        assert_eq!(b.groups[0].summary.upper_whisker, 7.0);
    }
}
