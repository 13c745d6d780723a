use crate::config::AppConfig;
use crate::data::{self, AGE, DIAGNOSIS, LYVE1, PLASMA_CA19_9, STAGE};
use crate::error::{DashboardError, Result};
use crate::views::{self, ViewOutput};
use polars::prelude::DataFrame;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Diagnosis {
    Healthy,
    BenignDisease,
    PancreaticCancer,
}

impl Diagnosis {
    pub const ALL: [Diagnosis; 3] = [
        Diagnosis::Healthy,
        Diagnosis::BenignDisease,
        Diagnosis::PancreaticCancer,
    ];

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Diagnosis::Healthy),
            2 => Some(Diagnosis::BenignDisease),
            3 => Some(Diagnosis::PancreaticCancer),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Diagnosis::Healthy => 1,
            Diagnosis::BenignDisease => 2,
            Diagnosis::PancreaticCancer => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Diagnosis::Healthy => "Healthy",
            Diagnosis::BenignDisease => "Benign Disease",
            Diagnosis::PancreaticCancer => "Pancreatic Cancer",
        }
    }
}

/// One togglable section of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Overview,
    SummaryStatistics,
    MissingValues,
    Distribution,
    CorrelationHeatmap,
    AgeByDiagnosis,
    Ca19_9ByDiagnosis,
    Lyve1ByStage,
}

impl View {
    pub const ALL: [View; 8] = [
        View::Overview,
        View::SummaryStatistics,
        View::MissingValues,
        View::Distribution,
        View::CorrelationHeatmap,
        View::AgeByDiagnosis,
        View::Ca19_9ByDiagnosis,
        View::Lyve1ByStage,
    ];

    pub fn toggle_label(self) -> &'static str {
        match self {
            View::Overview => "Show dataset overview",
            View::SummaryStatistics => "Show summary statistics",
            View::MissingValues => "Show missing values summary",
            View::Distribution => "Show distribution histogram",
            View::CorrelationHeatmap => "Show correlation heatmap",
            View::AgeByDiagnosis => "Show age distribution by diagnosis",
            View::Ca19_9ByDiagnosis => "Show CA19-9 levels by diagnosis",
            View::Lyve1ByStage => "Show LYVE1 levels by cancer stage",
        }
    }

    /// Columns that must exist before the view is computed. The histogram's requirement
    /// is the selected column and is not part of this fixed set.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            View::AgeByDiagnosis => &[DIAGNOSIS, AGE],
            View::Ca19_9ByDiagnosis => &[DIAGNOSIS, PLASMA_CA19_9],
            View::Lyve1ByStage => &[DIAGNOSIS, STAGE, LYVE1],
            View::Overview
            | View::SummaryStatistics
            | View::MissingValues
            | View::Distribution
            | View::CorrelationHeatmap => &[],
        }
    }
}

pub struct Dataset {
    pub name: String,
    pub path: PathBuf,
    pub df: DataFrame,
}

pub enum DatasetState {
    Ready(Dataset),
    Unavailable(DashboardError),
}

impl DatasetState {
    pub fn load(config: &AppConfig) -> Self {
        let path = config.dataset_path.clone();
        match data::load_csv_dataset(&path, config.infer_schema_length) {
            Ok(df) => DatasetState::Ready(Dataset {
                name: path
                    .file_name()
                    .and_then(|s| s.to_str())
                    .unwrap_or("csv")
                    .to_string(),
                path,
                df,
            }),
            Err(err) => {
                tracing::error!("{}", err);
                DatasetState::Unavailable(err)
            }
        }
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        match self {
            DatasetState::Ready(ds) => Some(ds),
            DatasetState::Unavailable(_) => None,
        }
    }
}

type ViewKey = (View, Option<String>);

pub struct AppState {
    pub dataset: DatasetState,
    pub enabled: HashSet<View>,
    pub histogram_column: Option<String>,
    pub preview_rows: usize,
    outputs: HashMap<ViewKey, Result<ViewOutput>>,
}

impl AppState {
    pub fn new(dataset: DatasetState, config: &AppConfig) -> Self {
        let histogram_column = dataset
            .dataset()
            .and_then(|ds| data::numeric_columns(&ds.df).into_iter().next());
        Self {
            dataset,
            enabled: HashSet::new(),
            histogram_column,
            preview_rows: config.preview_rows,
            outputs: HashMap::new(),
        }
    }

    pub fn is_enabled(&self, view: View) -> bool {
        self.enabled.contains(&view)
    }

    pub fn set_enabled(&mut self, view: View, on: bool) {
        if on {
            self.enabled.insert(view);
        } else {
            self.enabled.remove(&view);
        }
    }

    pub fn histogram_choices(&self) -> Vec<String> {
        self.dataset
            .dataset()
            .map(|ds| data::numeric_columns(&ds.df))
            .unwrap_or_default()
    }

    /// Output of `view` for the loaded dataset, computed on first request.
    ///
    /// `None` when the dataset is unavailable.
    pub fn output(&mut self, view: View) -> Option<&Result<ViewOutput>> {
        let ds = self.dataset.dataset()?;
        let selection = match view {
            View::Distribution => self.histogram_column.clone(),
            _ => None,
        };
        let preview_rows = self.preview_rows;
        let key = (view, selection);

        if !self.outputs.contains_key(&key) {
            let result = views::compute(view, &ds.df, key.1.as_deref(), preview_rows);
            if let Err(err) = &result {
                tracing::warn!("{:?} unavailable: {}", view, err);
            }
            self.outputs.insert(key.clone(), result);
        }
        self.outputs.get(&key)
    }
}
