//! Monthly aggregation shared by every source.
//!
//! Rows are bucketed by calendar month (the date truncated to the first day
//! of its month) plus any number of categorical keys, and each value column
//! is replaced by its mean over the bucket.

use polars::prelude::*;
use tracing::info;

use crate::error::{EtlError, EtlResult};

/// Intermediate bucket key; renamed back to the date field in the output.
const YEAR_MONTH: &str = "year_month";

/// Average `value_fields` per calendar month and per distinct combination of
/// `group_fields`.
///
/// The output has one row per (month, group) pair with the columns
/// `date_field`, then `group_fields`, then `value_fields`, sorted by the same
/// order. `date_field` holds the first day of each month. Rows whose date or
/// any group field is null are ignored.
pub fn aggregate_monthly(
    df: DataFrame,
    date_field: &str,
    value_fields: &[&str],
    group_fields: &[&str],
) -> EtlResult<DataFrame> {
    if value_fields.is_empty() {
        return Err(EtlError::invalid_param(
            "value_fields",
            "at least one value column is required",
        ));
    }
    for field in std::iter::once(&date_field)
        .chain(value_fields)
        .chain(group_fields)
    {
        if df.column(field).is_err() {
            return Err(EtlError::invalid_param(
                "aggregate_monthly",
                format!("column '{field}' not found"),
            ));
        }
    }
    let rows_in = df.height();

    let mut keys = vec![col(date_field)
        .dt()
        .month_start()
        .cast(DataType::Date)
        .alias(YEAR_MONTH)];
    keys.extend(group_fields.iter().map(|field| col(*field)));

    let means: Vec<Expr> = value_fields
        .iter()
        .map(|field| col(*field).cast(DataType::Float64).mean().alias(*field))
        .collect();

    let mut output: Vec<Expr> = vec![col(YEAR_MONTH).alias(date_field)];
    output.extend(group_fields.iter().map(|field| col(*field)));
    output.extend(value_fields.iter().map(|field| col(*field)));

    let mut order: Vec<&str> = vec![date_field];
    order.extend_from_slice(group_fields);

    let complete_keys = group_fields
        .iter()
        .fold(col(date_field).is_not_null(), |acc, field| {
            acc.and(col(*field).is_not_null())
        });

    let monthly = df
        .lazy()
        .filter(complete_keys)
        .group_by(keys)
        .agg(means)
        .select(output)
        .sort(order, SortMultipleOptions::default())
        .collect()?;

    info!(
        date_field,
        groups = group_fields.len(),
        rows_in,
        rows_out = monthly.height(),
        "monthly summary computed"
    );
    Ok(monthly)
}
