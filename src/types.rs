//! Core type definitions shared by every pipeline stage.
//!
//! Column names are kept as constants so that the normalizer, aggregator,
//! merger and loader agree on one schema vocabulary.

use std::fmt;

use polars::prelude::DataFrame;

use crate::error::{EtlError, EtlResult};

// ============================================================================
// Column Names
// ============================================================================

/// Date column of every normalized relation.
pub const FECHA: &str = "fecha";
pub const PRECIO_CRUDO: &str = "precio_crudo";
pub const TIPO: &str = "tipo";
pub const PRECIO_DOLAR_VENTA: &str = "precio_dolar_venta";
pub const PROVINCIA: &str = "provincia";
pub const PRODUCTO: &str = "producto";
pub const ID_PRODUCTO: &str = "idproducto";
pub const PRECIO_COMBUSTIBLES: &str = "precio_combustibles";
pub const SECTOR: &str = "sector";
pub const TOTAL: &str = "total";
pub const UNIDAD: &str = "unidad";

/// Raw crude-oil fields.
pub const CRUDE_OIL_FIELDS: [&str; 2] = ["date", "value"];
/// Raw currency-quote fields.
pub const CURRENCY_FIELDS: [&str; 4] = ["casa", "fecha", "compra", "venta"];
/// Raw fuel-price fields (current and historical files share them).
pub const FUEL_PRICE_FIELDS: [&str; 5] = ["fecha_vigencia", "provincia", "idproducto", "producto", "precio"];
/// Raw fuel-sales fields.
pub const FUEL_SALES_FIELDS: [&str; 6] = ["indice_tiempo", "provincia", "sector", "producto", "total", "unidad"];

// ============================================================================
// Sources
// ============================================================================

/// Identifies one upstream relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    CrudeOil,
    Currency,
    FuelPricesCurrent,
    FuelPricesHistorical,
    FuelSales,
}

impl Source {
    pub const ALL: [Source; 5] = [
        Source::CrudeOil,
        Source::Currency,
        Source::FuelPricesCurrent,
        Source::FuelPricesHistorical,
        Source::FuelSales,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::CrudeOil => "crude_oil",
            Source::Currency => "currency",
            Source::FuelPricesCurrent => "fuel_prices_current",
            Source::FuelPricesHistorical => "fuel_prices_historical",
            Source::FuelSales => "fuel_sales",
        }
    }

    /// Fields the raw relation must carry.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Source::CrudeOil => &CRUDE_OIL_FIELDS,
            Source::Currency => &CURRENCY_FIELDS,
            Source::FuelPricesCurrent | Source::FuelPricesHistorical => &FUEL_PRICE_FIELDS,
            Source::FuelSales => &FUEL_SALES_FIELDS,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exchange-rate kinds kept by the currency normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurrencyKind {
    Oficial,
    Blue,
}

impl CurrencyKind {
    pub const ALL: [CurrencyKind; 2] = [CurrencyKind::Oficial, CurrencyKind::Blue];

    pub fn as_str(&self) -> &'static str {
        match self {
            CurrencyKind::Oficial => "oficial",
            CurrencyKind::Blue => "blue",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == label)
    }
}

// ============================================================================
// Raw Inputs
// ============================================================================

/// The five raw relations handed to the transform stage.
///
/// Only obtainable through [`RawSourcesBuilder::build`], which refuses to
/// produce a value while any relation is absent.
#[derive(Debug, Clone)]
pub struct RawSources {
    pub crude_oil: DataFrame,
    pub currency: DataFrame,
    pub fuel_prices_current: DataFrame,
    pub fuel_prices_historical: DataFrame,
    pub fuel_sales: DataFrame,
}

impl RawSources {
    pub fn builder() -> RawSourcesBuilder {
        RawSourcesBuilder::default()
    }
}

/// Collects raw relations one by one as collaborators deliver them.
#[derive(Debug, Default)]
pub struct RawSourcesBuilder {
    crude_oil: Option<DataFrame>,
    currency: Option<DataFrame>,
    fuel_prices_current: Option<DataFrame>,
    fuel_prices_historical: Option<DataFrame>,
    fuel_sales: Option<DataFrame>,
}

impl RawSourcesBuilder {
    pub fn crude_oil(mut self, df: DataFrame) -> Self {
        self.crude_oil = Some(df);
        self
    }

    pub fn currency(mut self, df: DataFrame) -> Self {
        self.currency = Some(df);
        self
    }

    pub fn fuel_prices_current(mut self, df: DataFrame) -> Self {
        self.fuel_prices_current = Some(df);
        self
    }

    pub fn fuel_prices_historical(mut self, df: DataFrame) -> Self {
        self.fuel_prices_historical = Some(df);
        self
    }

    pub fn fuel_sales(mut self, df: DataFrame) -> Self {
        self.fuel_sales = Some(df);
        self
    }

    /// Set the relation for `source`.
    pub fn with(self, source: Source, df: DataFrame) -> Self {
        match source {
            Source::CrudeOil => self.crude_oil(df),
            Source::Currency => self.currency(df),
            Source::FuelPricesCurrent => self.fuel_prices_current(df),
            Source::FuelPricesHistorical => self.fuel_prices_historical(df),
            Source::FuelSales => self.fuel_sales(df),
        }
    }

    /// Fails with `UpstreamUnavailable` naming the first missing source.
    pub fn build(self) -> EtlResult<RawSources> {
        Ok(RawSources {
            crude_oil: require(self.crude_oil, Source::CrudeOil)?,
            currency: require(self.currency, Source::Currency)?,
            fuel_prices_current: require(self.fuel_prices_current, Source::FuelPricesCurrent)?,
            fuel_prices_historical: require(
                self.fuel_prices_historical,
                Source::FuelPricesHistorical,
            )?,
            fuel_sales: require(self.fuel_sales, Source::FuelSales)?,
        })
    }
}

fn require(df: Option<DataFrame>, source: Source) -> EtlResult<DataFrame> {
    df.ok_or_else(|| EtlError::upstream(source, "no relation was supplied"))
}

/// Fail with `MissingColumn` unless `df` carries every field `source` requires.
pub fn require_columns(df: &DataFrame, source: Source) -> EtlResult<()> {
    for field in source.required_fields() {
        if df.column(field).is_err() {
            return Err(EtlError::missing_column(source, *field));
        }
    }
    Ok(())
}
