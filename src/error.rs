//! Error type shared by the loader, the column guard and the view computations.

use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    /// The dataset could not be read; fatal for the session.
    #[error("Dataset unavailable at {}: {reason}", path.display())]
    DatasetUnavailable { path: PathBuf, reason: String },

    /// A view needs columns the dataset does not have; only that view is affected.
    #[error("Required column(s) missing from the dataset: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("No numeric column selected")]
    NoColumnSelected,

    #[error("Data error: {0}")]
    Polars(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
