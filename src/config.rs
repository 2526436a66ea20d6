//! Pipeline configuration.
//!
//! Values come from the process environment, optionally seeded from a
//! `.env` file, with defaults for everything except the FRED credential.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;

use crate::error::{EtlError, EtlResult};

pub const DEFAULT_FRED_BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";
pub const DEFAULT_FRED_SERIES_ID: &str = "POILBREUSDM";
pub const DEFAULT_DOLAR_API_URL: &str = "https://api.argentinadatos.com/v1/cotizaciones/dolares";
pub const DEFAULT_TABLE_NAME: &str = "fuel_prices_dw";

/// Configuration for a full extract-transform-load run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// FRED credential; only required when crude oil is fetched over HTTP
    pub fred_api_key: Option<String>,
    pub fred_base_url: String,
    /// Monthly crude-oil benchmark series
    pub fred_series_id: String,
    /// First observation requested; the last one is always today
    pub observation_start: NaiveDate,
    pub dolar_api_url: String,
    pub fuel_prices_historical_csv: PathBuf,
    pub fuel_prices_current_csv: PathBuf,
    pub fuel_sales_csv: PathBuf,
    /// SQLite database receiving the fact table
    pub database_path: PathBuf,
    pub table_name: String,
    pub http_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fred_api_key: None,
            fred_base_url: DEFAULT_FRED_BASE_URL.to_string(),
            fred_series_id: DEFAULT_FRED_SERIES_ID.to_string(),
            observation_start: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN),
            dolar_api_url: DEFAULT_DOLAR_API_URL.to_string(),
            fuel_prices_historical_csv: PathBuf::from("data/precios-historicos.csv"),
            fuel_prices_current_csv: PathBuf::from("data/precios-en-surtidor-vigentes.csv"),
            fuel_sales_csv: PathBuf::from("data/ventas-mercado-producto-provincia.csv"),
            database_path: PathBuf::from("fuel_prices_dw.sqlite"),
            table_name: DEFAULT_TABLE_NAME.to_string(),
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl PipelineConfig {
    /// Load `.env` (if present) and read the configuration from the environment.
    pub fn from_env() -> EtlResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_current_env()
    }

    /// Load a specific env file, then read the configuration.
    pub fn from_env_file(path: &std::path::Path) -> EtlResult<Self> {
        dotenvy::from_path(path)
            .map_err(|e| EtlError::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_current_env()
    }

    /// Read the configuration from variables already in the environment.
    pub fn from_current_env() -> EtlResult<Self> {
        let defaults = Self::default();

        let observation_start = match var("OBSERVATION_START") {
            Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
                EtlError::config(format!("OBSERVATION_START '{raw}' is not a date: {e}"))
            })?,
            None => defaults.observation_start,
        };

        let http_timeout = match var("HTTP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.parse().map_err(|e| {
                EtlError::config(format!("HTTP_TIMEOUT_SECS '{raw}' is not a number: {e}"))
            })?),
            None => defaults.http_timeout,
        };

        Ok(Self {
            fred_api_key: var("FRED_API_KEY"),
            fred_base_url: var("FRED_BASE_URL").unwrap_or(defaults.fred_base_url),
            fred_series_id: var("FRED_SERIES_ID").unwrap_or(defaults.fred_series_id),
            observation_start,
            dolar_api_url: var("DOLAR_API_URL").unwrap_or(defaults.dolar_api_url),
            fuel_prices_historical_csv: var("FUEL_PRICES_HISTORICAL_CSV")
                .map(PathBuf::from)
                .unwrap_or(defaults.fuel_prices_historical_csv),
            fuel_prices_current_csv: var("FUEL_PRICES_CURRENT_CSV")
                .map(PathBuf::from)
                .unwrap_or(defaults.fuel_prices_current_csv),
            fuel_sales_csv: var("FUEL_SALES_CSV")
                .map(PathBuf::from)
                .unwrap_or(defaults.fuel_sales_csv),
            database_path: var("DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            table_name: var("DB_TABLE").unwrap_or(defaults.table_name),
            http_timeout,
        })
    }

    /// The FRED key, or a configuration error naming the variable.
    pub fn require_fred_api_key(&self) -> EtlResult<&str> {
        self.fred_api_key
            .as_deref()
            .ok_or_else(|| EtlError::config("missing FRED_API_KEY in environment (.env)"))
    }
}

/// Non-empty environment variable.
fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
