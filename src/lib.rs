pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod stats;
pub mod ui;
pub mod views;
