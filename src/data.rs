use crate::error::{DashboardError, Result};
use crate::models::Diagnosis;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

pub const DIAGNOSIS: &str = "diagnosis";
pub const DIAGNOSIS_LABEL: &str = "diagnosis_label";
pub const AGE: &str = "age";
pub const PLASMA_CA19_9: &str = "plasma_CA19_9";
pub const LYVE1: &str = "LYVE1";
pub const STAGE: &str = "stage";

pub fn load_csv_dataset<P: AsRef<Path>>(
    file_path: P,
    infer_schema_length: usize,
) -> Result<DataFrame> {
    let path = file_path.as_ref();
    let unavailable = |reason: String| DashboardError::DatasetUnavailable {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| unavailable(e.to_string()))?;
    let df = CsvReader::new(file)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(Some(infer_schema_length)),
        )
        .finish()
        .map_err(|e| unavailable(e.to_string()))?;

    if df.width() == 0 {
        return Err(unavailable("file has no columns".to_string()));
    }

    tracing::info!(
        "Loaded {} ({} rows x {} columns)",
        path.display(),
        df.height(),
        df.width()
    );
    Ok(df)
}

pub fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// Names of the integer and float columns, in frame order.
pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| is_numeric(c.dtype()))
        .map(|c| c.name().to_string())
        .collect()
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Fails with every absent name when any of `required` is not a column of `df`.
pub fn require_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| !has_column(df, name))
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(DashboardError::MissingColumns { missing })
    }
}

/// Column values as `f64`; nulls, NaNs, infinities and uncastable entries become `None`.
pub fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

pub fn non_null_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    Ok(float_values(df, name)?.into_iter().flatten().collect())
}

/// Nulls plus, for float columns, NaN entries.
pub fn missing_count(df: &DataFrame, name: &str) -> Result<usize> {
    let column = df.column(name)?;
    match column.dtype() {
        DataType::Float32 | DataType::Float64 => {
            let values = column.cast(&DataType::Float64)?;
            Ok(values
                .f64()?
                .into_iter()
                .filter(|v| v.is_none_or(|x| x.is_nan()))
                .count())
        }
        _ => Ok(column.null_count()),
    }
}

/// Rows coded with `diagnosis`; null, fractional and unknown codes do not match.
pub fn diagnosis_mask(df: &DataFrame, diagnosis: Diagnosis) -> Result<BooleanChunked> {
    let codes = df.column(DIAGNOSIS)?.cast(&DataType::Float64)?;
    Ok(codes.f64()?.equal(diagnosis.code() as f64))
}

/// Rows whose `name` value, read as text, equals `key`.
pub fn key_mask(df: &DataFrame, name: &str, key: &str) -> Result<BooleanChunked> {
    let text = df.column(name)?.cast(&DataType::String)?;
    Ok(text.str()?.equal(key))
}

/// Distinct non-null values of `name` as text. Numeric columns are ordered by value,
/// anything else lexicographically.
pub fn group_keys(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df.column(name)?;
    let numeric = is_numeric(column.dtype());
    let text = column.cast(&DataType::String)?;
    let unique = text.str()?.unique()?;

    let mut keys: Vec<String> = (&unique)
        .into_iter()
        .flatten()
        .map(str::to_owned)
        .collect();
    if numeric {
        keys.sort_by(|a, b| match (a.parse::<f64>(), b.parse::<f64>()) {
            (Ok(x), Ok(y)) => x.total_cmp(&y),
            _ => a.cmp(b),
        });
    } else {
        keys.sort();
    }
    Ok(keys)
}

/// Integral diagnosis codes; fractional or missing entries become `None`.
pub fn diagnosis_codes(df: &DataFrame) -> Result<Vec<Option<i64>>> {
    Ok(float_values(df, DIAGNOSIS)?
        .into_iter()
        .map(|v| v.filter(|x| x.fract() == 0.0).map(|x| x as i64))
        .collect())
}

/// Clone of `df` with `diagnosis_label` derived from `diagnosis`.
///
/// The clone shares column buffers with the original; only the new column is allocated.
pub fn with_diagnosis_label(df: &DataFrame) -> Result<DataFrame> {
    let labels: Vec<Option<&'static str>> = diagnosis_codes(df)?
        .into_iter()
        .map(|code| code.and_then(Diagnosis::from_code).map(Diagnosis::label))
        .collect();

    let mut labeled = df.clone();
    labeled.with_column(Series::new(PlSmallStr::from_static(DIAGNOSIS_LABEL), labels))?;
    Ok(labeled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_keeps_exact_shape() {
        let file = write_csv(
            "sample_id,diagnosis,age,stage,plasma_CA19_9,LYVE1\n\
             S1,1,33,,11.7,0.89\n\
             S2,2,81,,,2.04\n\
             S3,3,51,IB,7.0,5.13\n",
        );
        let df = load_csv_dataset(file.path(), 100).unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 6);
        assert_eq!(
            column_names(&df),
            vec!["sample_id", "diagnosis", "age", "stage", "plasma_CA19_9", "LYVE1"]
        );
    }

    #[test]
    fn test_load_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.csv");
        match load_csv_dataset(&path, 100) {
            Err(DashboardError::DatasetUnavailable { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected unavailable dataset, got {:?}", other.map(|df| df.shape())),
        }
    }

    #[test]
    fn test_load_empty_file_is_unavailable() {
        let file = write_csv("");
        assert!(matches!(
            load_csv_dataset(file.path(), 100),
            Err(DashboardError::DatasetUnavailable { .. })
        ));
    }

    #[test]
    fn test_numeric_columns_skip_strings() {
        let df = df!(
            "sample_id" => ["a", "b"],
            "age" => [40i64, 50],
            "LYVE1" => [Some(1.5), None],
        )
        .unwrap();
        assert_eq!(numeric_columns(&df), vec!["age", "LYVE1"]);
    }

    #[test]
    fn test_require_columns_names_every_missing_column() {
        let df = df!("diagnosis" => [1i64, 2]).unwrap();
        assert!(require_columns(&df, &[DIAGNOSIS]).is_ok());
        assert!(require_columns(&df, &[]).is_ok());

        match require_columns(&df, &[DIAGNOSIS, STAGE, LYVE1]) {
            Err(DashboardError::MissingColumns { missing }) => {
                assert_eq!(missing, vec!["stage", "LYVE1"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_float_values_drop_infinities() {
        let df = df!(
            "x" => [Some(1.0), Some(f64::INFINITY), Some(f64::NEG_INFINITY), None],
        )
        .unwrap();
        assert_eq!(
            float_values(&df, "x").unwrap(),
            vec![Some(1.0), None, None, None]
        );
        assert_eq!(non_null_values(&df, "x").unwrap(), vec![1.0]);
        assert_eq!(missing_count(&df, "x").unwrap(), 1);
    }

    #[test]
    fn test_load_parses_inf_as_non_finite() {
        let file = write_csv("LYVE1\n1.5\ninf\n2.5\n");
        let df = load_csv_dataset(file.path(), 100).unwrap();
        assert_eq!(non_null_values(&df, LYVE1).unwrap(), vec![1.5, 2.5]);
    }

    #[test]
    fn test_diagnosis_mask_matches_exact_codes() {
        let df = df!("diagnosis" => [Some(3.0), Some(1.0), Some(3.5), None, Some(3.0)]).unwrap();
        let mask = diagnosis_mask(&df, Diagnosis::PancreaticCancer).unwrap();
        assert_eq!(df.filter(&mask).unwrap().height(), 2);
    }

    #[test]
    fn test_group_keys_order() {
        let df = df!(
            "numeric" => [Some(10i64), Some(2), None, Some(2), Some(1)],
            "text" => [Some("III"), Some("IB"), None, Some("IB"), Some("IIA")],
        )
        .unwrap();
        assert_eq!(group_keys(&df, "numeric").unwrap(), vec!["1", "2", "10"]);
        assert_eq!(group_keys(&df, "text").unwrap(), vec!["IB", "IIA", "III"]);

        let mask = key_mask(&df, "numeric", "2").unwrap();
        assert_eq!(df.filter(&mask).unwrap().height(), 2);
    }

    #[test]
    fn test_float_values_drop_nan_and_null() {
        let df = df!("x" => [Some(1.0), None, Some(f64::NAN), Some(4.0)]).unwrap();
        assert_eq!(
            float_values(&df, "x").unwrap(),
            vec![Some(1.0), None, None, Some(4.0)]
        );
        assert_eq!(non_null_values(&df, "x").unwrap(), vec![1.0, 4.0]);
    }

    #[test]
    fn test_missing_count_includes_nan() {
        let df = df!(
            "x" => [Some(1.0), None, Some(f64::NAN)],
            "s" => [Some("a"), None, None],
        )
        .unwrap();
        assert_eq!(missing_count(&df, "x").unwrap(), 2);
        assert_eq!(missing_count(&df, "s").unwrap(), 2);
    }

    #[test]
    fn test_diagnosis_label_column() {
        let df = df!("diagnosis" => [Some(1i64), Some(2), Some(3), Some(4), None]).unwrap();
        let labeled = with_diagnosis_label(&df).unwrap();
        assert!(!has_column(&df, DIAGNOSIS_LABEL));
        let labels: Vec<Option<&str>> = labeled
            .column(DIAGNOSIS_LABEL)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(
            labels,
            vec![
                Some("Healthy"),
                Some("Benign Disease"),
                Some("Pancreatic Cancer"),
                None,
                None,
            ]
        );
    }

    #[test]
    fn test_diagnosis_codes_from_float_column() {
        let df = df!("diagnosis" => [1.0, 3.0, 2.5]).unwrap();
        assert_eq!(diagnosis_codes(&df).unwrap(), vec![Some(1), Some(3), None]);
    }
}
