//! Configuration read from the process environment.

use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use fuel_market_etl::config::PipelineConfig;
use serial_test::serial;
use tempfile::NamedTempFile;

const VARS: [&str; 11] = [
    "FRED_API_KEY",
    "FRED_BASE_URL",
    "FRED_SERIES_ID",
    "OBSERVATION_START",
    "DOLAR_API_URL",
    "FUEL_PRICES_HISTORICAL_CSV",
    "FUEL_PRICES_CURRENT_CSV",
    "FUEL_SALES_CSV",
    "DB_PATH",
    "DB_TABLE",
    "HTTP_TIMEOUT_SECS",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults_when_unset() {
    clear_env();
    let config = PipelineConfig::from_current_env().unwrap();

    assert!(config.fred_api_key.is_none());
    assert_eq!(config.table_name, "fuel_prices_dw");
    assert_eq!(config.database_path, PathBuf::from("fuel_prices_dw.sqlite"));
}

#[test]
#[serial]
fn test_overrides_from_env() {
    clear_env();
    env::set_var("FRED_API_KEY", "secret");
    env::set_var("OBSERVATION_START", "2015-06-01");
    env::set_var("DB_TABLE", "fact");
    env::set_var("HTTP_TIMEOUT_SECS", "5");
    env::set_var("FUEL_SALES_CSV", "/tmp/sales.csv");

    let config = PipelineConfig::from_current_env().unwrap();
    clear_env();

    assert_eq!(config.require_fred_api_key().unwrap(), "secret");
    assert_eq!(config.observation_start, NaiveDate::from_ymd_opt(2015, 6, 1).unwrap());
    assert_eq!(config.table_name, "fact");
    assert_eq!(config.http_timeout, Duration::from_secs(5));
    assert_eq!(config.fuel_sales_csv, PathBuf::from("/tmp/sales.csv"));
}

#[test]
#[serial]
fn test_blank_value_falls_back_to_default() {
    clear_env();
    env::set_var("DB_TABLE", "   ");

    let config = PipelineConfig::from_current_env().unwrap();
    clear_env();

    assert_eq!(config.table_name, "fuel_prices_dw");
}

#[test]
#[serial]
fn test_bad_date_is_config_error() {
    clear_env();
    env::set_var("OBSERVATION_START", "yesterday");

    let err = PipelineConfig::from_current_env().unwrap_err();
    clear_env();

    assert!(err.to_string().contains("OBSERVATION_START"));
}

#[test]
#[serial]
fn test_bad_timeout_is_config_error() {
    clear_env();
    env::set_var("HTTP_TIMEOUT_SECS", "soon");

    let err = PipelineConfig::from_current_env().unwrap_err();
    clear_env();

    assert!(err.to_string().contains("HTTP_TIMEOUT_SECS"));
}

#[test]
#[serial]
fn test_env_file_is_loaded() {
    clear_env();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "FRED_SERIES_ID=DCOILWTICO").unwrap();
    writeln!(file, "DB_PATH=warehouse.sqlite").unwrap();
    file.flush().unwrap();

    let config = PipelineConfig::from_env_file(file.path()).unwrap();
    clear_env();

    assert_eq!(config.fred_series_id, "DCOILWTICO");
    assert_eq!(config.database_path, PathBuf::from("warehouse.sqlite"));
}

#[test]
#[serial]
fn test_missing_env_file_is_config_error() {
    clear_env();
    let err = PipelineConfig::from_env_file(std::path::Path::new("/nonexistent/.env")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/.env"));
}
