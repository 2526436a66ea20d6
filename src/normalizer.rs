//! Per-source cleaning of the raw relations.
//!
//! Features:
//! - Whitespace trimming on text fields
//! - Date and number coercion where unparseable values become nulls
//! - Row elimination for missing critical values
//! - Sell/buy correction for currency quotes
//! - Product and province canonicalization for fuel prices
//! - Sparse-year and bad-month exclusion for fuel prices and sales
//!
//! Every operation consumes its input frame and returns a new one.

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{EtlError, EtlResult};
use crate::types::{
    require_columns, CurrencyKind, Source, FECHA, ID_PRODUCTO, PRECIO_COMBUSTIBLES,
    PRECIO_CRUDO, PRECIO_DOLAR_VENTA, PRODUCTO, PROVINCIA, SECTOR, TIPO, TOTAL, UNIDAD,
};
use crate::vocabulary::VocabularyReconciler;

/// Placeholder FRED publishes for observations without a value.
pub const MISSING_SENTINEL: &str = ".";

/// A year needs strictly more fuel-price rows than this to be kept.
pub const MIN_ROWS_PER_YEAR: u32 = 100;

/// Fuel-sales month known to carry bad data (year, month).
pub const EXCLUDED_SALES_MONTH: (i32, i32) = (2016, 1);

/// Products kept from the fuel-sales relation.
pub const SALES_PRODUCTS: [&str; 5] = [
    "Gas Natural",
    "Gasoil Grado 2 (Común)",
    "Gasoil Grado 3 (Ultra)",
    "Nafta Grado 2 (Súper)",
    "Nafta Grado 3 (Ultra)",
];

/// Accepted date layouts, tried in order. Day-first is the local convention
/// for slash-separated dates.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
const YEAR_KEY: &str = "anio";
const YEAR_ROWS: &str = "filas_anio";
const ROW_ORDER: &str = "orden";

/// Cleans each raw relation into its normalized schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    vocabulary: VocabularyReconciler,
}

impl Normalizer {
    /// Create a normalizer that canonicalizes labels with `vocabulary`.
    pub fn new(vocabulary: VocabularyReconciler) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &VocabularyReconciler {
        &self.vocabulary
    }

    /// Clean the crude-oil observations into (`fecha`, `precio_crudo`).
    ///
    /// Steps:
    /// 1. Trim every text column
    /// 2. Treat the `"."` sentinel as missing and coerce `value` to a number
    /// 3. Coerce `date` to a date
    /// 4. Drop rows missing either field
    /// 5. Check the output contract (non-null, float and date typed)
    pub fn clean_crude_oil(&self, df: DataFrame) -> EtlResult<DataFrame> {
        require_columns(&df, Source::CrudeOil)?;
        let rows_in = df.height();

        let trims = trim_text_columns(&df);
        let value = coerce_text(col("value"));

        let out = df
            .lazy()
            .with_columns(trims)
            .with_column(
                when(value.clone().eq(lit(MISSING_SENTINEL)))
                    .then(lit(NULL))
                    .otherwise(value)
                    .alias("value"),
            )
            .select([
                coerce_date(col("date")).alias(FECHA),
                coerce_number(col("value")).alias(PRECIO_CRUDO),
            ])
            .filter(col(PRECIO_CRUDO).is_not_null().and(col(FECHA).is_not_null()))
            .collect()?;

        check_crude_oil_contract(&out)?;
        log_stage(Source::CrudeOil.as_str(), rows_in, &out);
        Ok(out)
    }

    /// Clean the currency quotes into (`fecha`, `tipo`, `precio_dolar_venta`).
    ///
    /// When the sell price is below the buy price the row is corrected to the
    /// mean of both instead of being rejected.
    pub fn clean_currency(&self, df: DataFrame) -> EtlResult<DataFrame> {
        require_columns(&df, Source::Currency)?;
        let rows_in = df.height();

        let kinds = CurrencyKind::ALL
            .iter()
            .map(|kind| col(TIPO).eq(lit(kind.as_str())))
            .reduce(|acc, cond| acc.or(cond))
            .unwrap_or_else(|| lit(false));

        let out = df
            .lazy()
            .rename(["casa"], [TIPO], true)
            .select([
                coerce_text(col(TIPO)).alias(TIPO),
                coerce_date(col("fecha")).alias(FECHA),
                coerce_number(col("compra")).alias("compra"),
                coerce_number(col("venta")).alias("venta"),
            ])
            .filter(
                col(TIPO)
                    .is_not_null()
                    .and(col(FECHA).is_not_null())
                    .and(col("compra").is_not_null())
                    .and(col("venta").is_not_null()),
            )
            .with_column(
                when(col("venta").lt(col("compra")))
                    .then((col("compra") + col("venta")) / lit(2.0))
                    .otherwise(col("venta"))
                    .alias(PRECIO_DOLAR_VENTA),
            )
            .filter(kinds)
            .select([col(FECHA), col(TIPO), col(PRECIO_DOLAR_VENTA)])
            .collect()?;

        log_stage(Source::Currency.as_str(), rows_in, &out);
        Ok(out)
    }

    /// Clean and concatenate the fuel-price relations.
    ///
    /// Historical rows come first and current rows are appended, and that
    /// order is kept in the output. Labels are canonicalized, then every year
    /// with `MIN_ROWS_PER_YEAR` dated rows or fewer is dropped. Rows whose
    /// price does not parse still count toward their year but are not kept.
    pub fn clean_fuel_prices(
        &self,
        current: DataFrame,
        historical: DataFrame,
    ) -> EtlResult<DataFrame> {
        let rows_in = current.height() + historical.height();

        let historical = project_fuel_prices(historical, Source::FuelPricesHistorical)?;
        let current = project_fuel_prices(current, Source::FuelPricesCurrent)?;

        // Every dated row counts toward its year, priced or not.
        let combined = concat([historical, current], UnionArgs::default())?
            .with_row_index(ROW_ORDER, None)
            .with_columns([
                self.vocabulary.product_expr(PRODUCTO),
                self.vocabulary.province_expr(PROVINCIA),
            ])
            .filter(col(FECHA).is_not_null())
            .with_column(col(FECHA).dt().year().alias(YEAR_KEY));

        let dense_years = combined
            .clone()
            .group_by([col(YEAR_KEY)])
            .agg([len().alias(YEAR_ROWS)])
            .filter(col(YEAR_ROWS).gt(lit(MIN_ROWS_PER_YEAR)))
            .select([col(YEAR_KEY)]);

        let out = combined
            .join(
                dense_years,
                [col(YEAR_KEY)],
                [col(YEAR_KEY)],
                JoinArgs::new(JoinType::Inner),
            )
            .filter(col(PRECIO_COMBUSTIBLES).is_not_null())
            .sort([ROW_ORDER], SortMultipleOptions::default())
            .select([
                col(FECHA),
                col(PROVINCIA),
                col(ID_PRODUCTO),
                col(PRODUCTO),
                col(PRECIO_COMBUSTIBLES),
            ])
            .collect()?;

        log_stage("fuel_prices", rows_in, &out);
        Ok(out)
    }

    /// Clean the fuel-sales relation into
    /// (`fecha`, `provincia`, `sector`, `producto`, `total`, `unidad`).
    pub fn clean_fuel_sales(&self, df: DataFrame) -> EtlResult<DataFrame> {
        require_columns(&df, Source::FuelSales)?;
        let rows_in = df.height();

        let known_product = SALES_PRODUCTS
            .iter()
            .map(|product| col(PRODUCTO).eq(lit(*product)))
            .reduce(|acc, cond| acc.or(cond))
            .unwrap_or_else(|| lit(false));

        let (bad_year, bad_month) = EXCLUDED_SALES_MONTH;
        let excluded_month = col(FECHA)
            .dt()
            .year()
            .eq(lit(bad_year))
            .and(col(FECHA).dt().month().cast(DataType::Int32).eq(lit(bad_month)));

        let out = df
            .lazy()
            .rename(["indice_tiempo"], [FECHA], true)
            .select([
                coerce_date(col(FECHA)).alias(FECHA),
                coerce_text(col(PROVINCIA)).alias(PROVINCIA),
                coerce_text(col(SECTOR)).alias(SECTOR),
                coerce_text(col(PRODUCTO)).alias(PRODUCTO),
                coerce_number(col(TOTAL)).alias(TOTAL),
                coerce_text(col(UNIDAD)).alias(UNIDAD),
            ])
            .filter(col(FECHA).is_not_null().and(col(TOTAL).is_not_null()))
            .filter(known_product)
            .filter(excluded_month.not())
            .collect()?;

        log_stage(Source::FuelSales.as_str(), rows_in, &out);
        Ok(out)
    }
}

// ============================================================================
// Coercion Helpers
// ============================================================================

/// Cast to text and strip surrounding whitespace.
fn coerce_text(expr: Expr) -> Expr {
    expr.cast(DataType::String).str().strip_chars(lit(NULL))
}

/// Parse a number; anything unparseable becomes null.
fn coerce_number(expr: Expr) -> Expr {
    coerce_text(expr).cast(DataType::Float64)
}

/// Parse a date in one of `DATE_FORMATS`; a trailing time part is ignored.
/// Anything else (including month-only values such as `2016-02`) becomes null.
fn coerce_date(expr: Expr) -> Expr {
    let text = coerce_text(expr);
    DATE_FORMATS
        .iter()
        .map(|format| {
            text.clone().str().to_date(StrptimeOptions {
                format: Some((*format).into()),
                strict: false,
                exact: false,
                ..Default::default()
            })
        })
        .reduce(|parsed, fallback| parsed.fill_null(fallback))
        .unwrap_or_else(|| lit(NULL).cast(DataType::Date))
}

fn trim_text_columns(df: &DataFrame) -> Vec<Expr> {
    df.get_columns()
        .iter()
        .filter(|c| c.dtype() == &DataType::String)
        .map(|c| {
            let name = c.name().to_string();
            col(name.as_str()).str().strip_chars(lit(NULL)).alias(name.as_str())
        })
        .collect()
}

fn project_fuel_prices(df: DataFrame, source: Source) -> EtlResult<LazyFrame> {
    require_columns(&df, source)?;
    debug!(source = %source, rows = df.height(), "projecting fuel prices");

    Ok(df.lazy().select([
        coerce_date(col("fecha_vigencia")).alias(FECHA),
        coerce_text(col(PROVINCIA)).alias(PROVINCIA),
        coerce_text(col(ID_PRODUCTO)).alias(ID_PRODUCTO),
        coerce_text(col(PRODUCTO)).alias(PRODUCTO),
        coerce_number(col("precio")).alias(PRECIO_COMBUSTIBLES),
    ]))
}

/// Crude oil must leave cleaning fully populated and correctly typed.
/// A failure here is an upstream contract breach, not data noise.
fn check_crude_oil_contract(df: &DataFrame) -> EtlResult<()> {
    let price = df.column(PRECIO_CRUDO)?;
    if price.dtype() != &DataType::Float64 {
        return Err(EtlError::contract(format!(
            "{PRECIO_CRUDO} has type {}, expected f64",
            price.dtype()
        )));
    }
    if price.null_count() > 0 {
        return Err(EtlError::contract(format!("{PRECIO_CRUDO} contains nulls")));
    }

    let date = df.column(FECHA)?;
    if date.dtype() != &DataType::Date {
        return Err(EtlError::contract(format!(
            "{FECHA} has type {}, expected date",
            date.dtype()
        )));
    }
    if date.null_count() > 0 {
        return Err(EtlError::contract(format!("{FECHA} contains nulls")));
    }
    Ok(())
}

fn log_stage(source: &str, rows_in: usize, out: &DataFrame) {
    if out.height() == 0 {
        warn!(source, rows_in, "normalization produced no rows");
    } else {
        info!(source, rows_in, rows_out = out.height(), "normalized");
    }
}

// ============================================================================
// Tests
// ============================================================================
