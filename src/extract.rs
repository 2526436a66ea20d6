//! Raw relation extraction.
//!
//! Provides the collaborators that turn upstream data into polars frames:
//! - FRED observations for the crude-oil benchmark (HTTP, JSON)
//! - Dollar quotes (HTTP, JSON)
//! - Fuel price and sales files (delimited text)
//!
//! Every failure is reported as `UpstreamUnavailable` for the source that
//! could not be obtained. Nothing is retried.

use std::io::Cursor;
use std::path::Path;

use chrono::Utc;
use encoding_rs::WINDOWS_1252;
use polars::prelude::*;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{EtlError, EtlResult};
use crate::types::{RawSources, Source};

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

/// One element of the dollar-quotes array. Absent fields become nulls.
#[derive(Debug, Deserialize)]
struct DollarQuote {
    #[serde(default)]
    casa: Option<String>,
    #[serde(default)]
    fecha: Option<String>,
    #[serde(default)]
    compra: Option<f64>,
    #[serde(default)]
    venta: Option<f64>,
}

/// Fetches every raw relation the pipeline needs.
pub struct Extractor {
    client: Client,
    config: PipelineConfig,
}

impl Extractor {
    pub fn new(config: PipelineConfig) -> EtlResult<Self> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fetch all five relations, stopping at the first unavailable source.
    pub fn extract_all(&self) -> EtlResult<RawSources> {
        RawSources::builder()
            .crude_oil(self.fetch_crude_oil()?)
            .currency(self.fetch_currency()?)
            .fuel_prices_historical(read_csv_source(
                &self.config.fuel_prices_historical_csv,
                Source::FuelPricesHistorical,
            )?)
            .fuel_prices_current(read_csv_source(
                &self.config.fuel_prices_current_csv,
                Source::FuelPricesCurrent,
            )?)
            .fuel_sales(read_csv_source(&self.config.fuel_sales_csv, Source::FuelSales)?)
            .build()
    }

    /// Crude-oil observations as string fields `date`, `value`.
    pub fn fetch_crude_oil(&self) -> EtlResult<DataFrame> {
        let source = Source::CrudeOil;
        let api_key = self.config.require_fred_api_key()?;
        let observation_end = Utc::now().date_naive().to_string();
        let observation_start = self.config.observation_start.to_string();

        let resp = self
            .client
            .get(&self.config.fred_base_url)
            .query(&[
                ("api_key", api_key),
                ("series_id", self.config.fred_series_id.as_str()),
                ("file_type", "json"),
                ("observation_start", observation_start.as_str()),
                ("observation_end", observation_end.as_str()),
            ])
            .send()
            .map_err(|e| EtlError::upstream(source, format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(EtlError::upstream(
                source,
                format!("request failed with status {}", resp.status()),
            ));
        }

        let body: ObservationsResponse = resp
            .json()
            .map_err(|e| EtlError::upstream(source, format!("cannot decode response: {e}")))?;
        info!(source = %source, rows = body.observations.len(), "API data obtained");

        observations_to_frame(body.observations)
    }

    /// Dollar quotes with fields `casa`, `fecha`, `compra`, `venta`.
    pub fn fetch_currency(&self) -> EtlResult<DataFrame> {
        let source = Source::Currency;

        let resp = self
            .client
            .get(&self.config.dolar_api_url)
            .send()
            .map_err(|e| EtlError::upstream(source, format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(EtlError::upstream(
                source,
                format!("request failed with status {}", resp.status()),
            ));
        }

        let quotes: Vec<DollarQuote> = resp
            .json()
            .map_err(|e| EtlError::upstream(source, format!("cannot decode response: {e}")))?;
        info!(source = %source, rows = quotes.len(), "API data obtained");

        quotes_to_frame(quotes)
    }
}

fn observations_to_frame(observations: Vec<Observation>) -> EtlResult<DataFrame> {
    let (dates, values): (Vec<String>, Vec<String>) = observations
        .into_iter()
        .map(|obs| (obs.date, obs.value))
        .unzip();

    Ok(df! {
        "date" => dates,
        "value" => values,
    }?)
}

fn quotes_to_frame(quotes: Vec<DollarQuote>) -> EtlResult<DataFrame> {
    let mut casa = Vec::with_capacity(quotes.len());
    let mut fecha = Vec::with_capacity(quotes.len());
    let mut compra = Vec::with_capacity(quotes.len());
    let mut venta = Vec::with_capacity(quotes.len());

    for quote in quotes {
        casa.push(quote.casa);
        fecha.push(quote.fecha);
        compra.push(quote.compra);
        venta.push(quote.venta);
    }

    Ok(df! {
        "casa" => casa,
        "fecha" => fecha,
        "compra" => compra,
        "venta" => venta,
    }?)
}

/// Read a delimited file with every column as text.
///
/// Valid UTF-8 is used as is; anything else is decoded as Windows-1252,
/// the Latin-1 superset the government exports are published in.
pub fn read_csv_source(path: &Path, source: Source) -> EtlResult<DataFrame> {
    let bytes = std::fs::read(path).map_err(|e| {
        EtlError::upstream(source, format!("cannot read {}: {e}", path.display()))
    })?;

    let text = decode_text(bytes);
    let df = parse_csv(text.into_bytes())
        .map_err(|e| EtlError::upstream(source, format!("cannot parse {}: {e}", path.display())))?;

    info!(source = %source, path = %path.display(), rows = df.height(), "csv obtained");
    Ok(df)
}

/// Decode file bytes, falling back to Windows-1252 when they are not UTF-8.
pub fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            debug!("input is not UTF-8, decoding as windows-1252");
            let (text, _, _) = WINDOWS_1252.decode(err.as_bytes());
            text.into_owned()
        }
    }
}

fn parse_csv(bytes: Vec<u8>) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
}
