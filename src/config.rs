use dotenv::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_DATASET_PATH: &str = "PC_urinary_marker.csv";
pub const DEFAULT_INFER_SCHEMA_LENGTH: usize = 1_000_000;
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub dataset_path: PathBuf,
    pub infer_schema_length: usize,
    pub preview_rows: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            infer_schema_length: DEFAULT_INFER_SCHEMA_LENGTH,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

impl AppConfig {
    /// Reads `.env` (if any) and then the process environment.
    pub fn from_env() -> Self {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            dataset_path: lookup("DATASET_PATH")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.dataset_path),
            infer_schema_length: parse_or(
                &lookup,
                "INFER_SCHEMA_LENGTH",
                defaults.infer_schema_length,
            ),
            preview_rows: parse_or(&lookup, "PREVIEW_ROWS", defaults.preview_rows),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        Some(val) => val.trim().parse::<T>().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using {}", key, val, default);
            default
        }),
        None => default,
    }
}
