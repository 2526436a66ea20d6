//! Four-way inner join producing the fact table.
//!
//! Join order:
//! 1. fuel prices ⋈ crude oil on `fecha`
//! 2. result ⋈ currency on `fecha`
//! 3. result ⋈ fuel sales on (`fecha`, `producto`, `provincia`)
//!
//! Every join is inner, so the fact table only covers the months present in
//! all four inputs and the (product, province) pairs present in both fuel
//! relations. Keys missing on either side simply produce no row.

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::{EtlError, EtlResult};
use crate::types::{
    FECHA, PRECIO_COMBUSTIBLES, PRECIO_CRUDO, PRECIO_DOLAR_VENTA, PRODUCTO, PROVINCIA, SECTOR,
    TIPO, TOTAL,
};

/// Column order of the fact table.
pub const FACT_COLUMNS: [&str; 9] = [
    FECHA,
    PRODUCTO,
    PROVINCIA,
    PRECIO_COMBUSTIBLES,
    PRECIO_CRUDO,
    TIPO,
    PRECIO_DOLAR_VENTA,
    SECTOR,
    TOTAL,
];

/// Join the four monthly relations into the fact table.
pub fn merge_all(
    crude_oil: &DataFrame,
    fuel_prices_monthly: &DataFrame,
    currency_monthly: &DataFrame,
    fuel_sales_monthly: &DataFrame,
) -> EtlResult<DataFrame> {
    expect_columns("crude_oil", crude_oil, &[FECHA, PRECIO_CRUDO])?;
    expect_columns(
        "fuel_prices_monthly",
        fuel_prices_monthly,
        &[FECHA, PRODUCTO, PROVINCIA, PRECIO_COMBUSTIBLES],
    )?;
    expect_columns("currency_monthly", currency_monthly, &[FECHA, TIPO, PRECIO_DOLAR_VENTA])?;
    expect_columns(
        "fuel_sales_monthly",
        fuel_sales_monthly,
        &[FECHA, SECTOR, PRODUCTO, PROVINCIA, TOTAL],
    )?;

    let by_date = || [col(FECHA)];
    let by_date_product_province = || [col(FECHA), col(PRODUCTO), col(PROVINCIA)];

    let crude = crude_oil.clone().lazy().select([col(FECHA), col(PRECIO_CRUDO)]);
    let currency = currency_monthly
        .clone()
        .lazy()
        .select([col(FECHA), col(TIPO), col(PRECIO_DOLAR_VENTA)]);
    let sales = fuel_sales_monthly
        .clone()
        .lazy()
        .select([col(FECHA), col(SECTOR), col(PRODUCTO), col(PROVINCIA), col(TOTAL)]);

    let fact = fuel_prices_monthly
        .clone()
        .lazy()
        .select([col(FECHA), col(PRODUCTO), col(PROVINCIA), col(PRECIO_COMBUSTIBLES)])
        .join(crude, by_date(), by_date(), JoinArgs::new(JoinType::Inner))
        .join(currency, by_date(), by_date(), JoinArgs::new(JoinType::Inner))
        .join(
            sales,
            by_date_product_province(),
            by_date_product_province(),
            JoinArgs::new(JoinType::Inner),
        )
        .select(FACT_COLUMNS.iter().map(|name| col(*name)).collect::<Vec<_>>())
        .sort(
            [FECHA, PRODUCTO, PROVINCIA, TIPO, SECTOR],
            SortMultipleOptions::default(),
        )
        .collect()?;

    debug!(shape = ?fact.shape(), "fact table joined");
    info!(rows = fact.height(), columns = fact.width(), "all relations merged");
    Ok(fact)
}

fn expect_columns(relation: &str, df: &DataFrame, columns: &[&str]) -> EtlResult<()> {
    for column in columns {
        if df.column(column).is_err() {
            return Err(EtlError::invalid_param(
                relation,
                format!("column '{column}' not found"),
            ));
        }
    }
    Ok(())
}
