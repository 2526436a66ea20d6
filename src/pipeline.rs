//! Transform and full-run orchestration.
//!
//! The four per-source branches (normalize, then aggregate to monthly) share
//! no state, so they run on the rayon pool. The merge waits for all four.

use polars::prelude::DataFrame;
use tracing::{info, instrument};

use crate::aggregator::aggregate_monthly;
use crate::error::EtlResult;
use crate::extract::Extractor;
use crate::merger::merge_all;
use crate::normalizer::Normalizer;
use crate::persistence::FactTableStore;
use crate::types::{
    RawSources, FECHA, PRECIO_COMBUSTIBLES, PRECIO_DOLAR_VENTA, PRODUCTO, PROVINCIA, SECTOR,
    TIPO, TOTAL,
};

/// Rows of the fact table shown in the run log.
pub const HEAD_ROWS: usize = 5;

/// The four monthly relations feeding the merge.
#[derive(Debug, Clone)]
pub struct MonthlyRelations {
    /// Already one observation per month, so not re-aggregated.
    pub crude_oil: DataFrame,
    pub currency: DataFrame,
    pub fuel_prices: DataFrame,
    pub fuel_sales: DataFrame,
}

/// Normalize, aggregate and merge the raw relations.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformPipeline {
    normalizer: Normalizer,
}

impl TransformPipeline {
    pub fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    /// Produce the fact table from the raw relations.
    pub fn run(&self, raw: RawSources) -> EtlResult<DataFrame> {
        let monthly = self.monthly(raw)?;
        merge_all(
            &monthly.crude_oil,
            &monthly.fuel_prices,
            &monthly.currency,
            &monthly.fuel_sales,
        )
    }

    /// Run the four independent branches and return their monthly outputs.
    pub fn monthly(&self, raw: RawSources) -> EtlResult<MonthlyRelations> {
        let RawSources {
            crude_oil,
            currency,
            fuel_prices_current,
            fuel_prices_historical,
            fuel_sales,
        } = raw;

        let ((crude_oil, currency), (fuel_prices, fuel_sales)) = rayon::join(
            || {
                rayon::join(
                    || self.crude_oil_branch(crude_oil),
                    || self.currency_branch(currency),
                )
            },
            || {
                rayon::join(
                    || self.fuel_prices_branch(fuel_prices_current, fuel_prices_historical),
                    || self.fuel_sales_branch(fuel_sales),
                )
            },
        );

        Ok(MonthlyRelations {
            crude_oil: crude_oil?,
            currency: currency?,
            fuel_prices: fuel_prices?,
            fuel_sales: fuel_sales?,
        })
    }

    fn crude_oil_branch(&self, df: DataFrame) -> EtlResult<DataFrame> {
        self.normalizer.clean_crude_oil(df)
    }

    fn currency_branch(&self, df: DataFrame) -> EtlResult<DataFrame> {
        let clean = self.normalizer.clean_currency(df)?;
        aggregate_monthly(clean, FECHA, &[PRECIO_DOLAR_VENTA], &[TIPO])
    }

    fn fuel_prices_branch(
        &self,
        current: DataFrame,
        historical: DataFrame,
    ) -> EtlResult<DataFrame> {
        let clean = self.normalizer.clean_fuel_prices(current, historical)?;
        aggregate_monthly(clean, FECHA, &[PRECIO_COMBUSTIBLES], &[PRODUCTO, PROVINCIA])
    }

    fn fuel_sales_branch(&self, df: DataFrame) -> EtlResult<DataFrame> {
        let clean = self.normalizer.clean_fuel_sales(df)?;
        aggregate_monthly(clean, FECHA, &[TOTAL], &[SECTOR, PRODUCTO, PROVINCIA])
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub fact_rows: usize,
    pub fact_columns: usize,
    /// `None` when loading was skipped.
    pub rows_loaded: Option<usize>,
}

/// Extract, transform and load in sequence.
pub struct EtlRunner {
    pipeline: TransformPipeline,
    store: Option<Box<dyn FactTableStore>>,
    table: String,
}

impl EtlRunner {
    /// Runner that loads the fact table into `store` under `table`.
    pub fn new(pipeline: TransformPipeline, store: Box<dyn FactTableStore>, table: &str) -> Self {
        Self {
            pipeline,
            store: Some(store),
            table: table.to_string(),
        }
    }

    /// Runner that stops after the transform.
    pub fn dry_run(pipeline: TransformPipeline) -> Self {
        Self {
            pipeline,
            store: None,
            table: String::new(),
        }
    }

    /// Fetch every source, then transform and load.
    pub fn run(&self, extractor: &Extractor) -> EtlResult<RunSummary> {
        let raw = extractor.extract_all()?;
        self.run_with(raw)
    }

    /// Transform and load relations that were already fetched.
    #[instrument(skip_all, fields(table = %self.table))]
    pub fn run_with(&self, raw: RawSources) -> EtlResult<RunSummary> {
        let fact = self.pipeline.run(raw)?;
        info!("fact table head:\n{}", fact.head(Some(HEAD_ROWS)));

        let rows_loaded = match &self.store {
            Some(store) => Some(store.replace_table(&self.table, &fact)?),
            None => {
                info!(rows = fact.height(), "dry run, load skipped");
                None
            }
        };

        Ok(RunSummary {
            fact_rows: fact.height(),
            fact_columns: fact.width(),
            rows_loaded,
        })
    }
}
