//! Fuel Market ETL
//!
//! Batch pipeline that gathers crude-oil, exchange-rate, fuel-price and
//! fuel-sales series, reconciles them to a monthly grain and loads a single
//! denormalized fact table.

pub mod error;
pub mod types;
pub mod vocabulary;
pub mod normalizer;
pub mod aggregator;
pub mod merger;
pub mod pipeline;
pub mod extract;
pub mod persistence;
pub mod config;
pub mod logger;

pub use error::{EtlError, EtlResult};
pub use types::*;
pub use vocabulary::VocabularyReconciler;
pub use normalizer::Normalizer;
pub use aggregator::aggregate_monthly;
pub use merger::{merge_all, FACT_COLUMNS};
pub use pipeline::{EtlRunner, MonthlyRelations, RunSummary, TransformPipeline};
pub use extract::Extractor;
pub use persistence::{FactTableStore, ParquetFactStore, SqliteFactStore};
pub use config::PipelineConfig;
pub use logger::init_logging;
