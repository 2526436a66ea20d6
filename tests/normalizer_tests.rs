//! Integration tests for per-source normalization.

use fuel_market_etl::normalizer::{Normalizer, MIN_ROWS_PER_YEAR};
use fuel_market_etl::types::*;
use fuel_market_etl::EtlError;
use polars::prelude::*;

fn str_values(df: &DataFrame, name: &str) -> Vec<String> {
    df.column(name)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect()
}

fn years(df: &DataFrame) -> Vec<i32> {
    let mut years: Vec<i32> = df
        .column(FECHA)
        .unwrap()
        .cast(&DataType::String)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .flatten()
        .map(|d| d[..4].parse().unwrap())
        .collect();
    years.dedup();
    years
}

/// `rows` fuel-price rows spread over the months of `year`.
fn fuel_prices_for_year(year: i32, rows: usize) -> DataFrame {
    let dates: Vec<String> = (0..rows)
        .map(|i| format!("{year}-{:02}-{:02}", i % 12 + 1, i % 28 + 1))
        .collect();
    df! {
        "fecha_vigencia" => dates,
        "provincia" => vec!["BUENOS AIRES"; rows],
        "idproducto" => vec!["2"; rows],
        "producto" => vec!["Nafta (súper) entre 92 y 95 Ron"; rows],
        "precio" => vec!["150.0"; rows],
    }
    .unwrap()
}

fn empty_fuel_prices() -> DataFrame {
    fuel_prices_for_year(2020, 0)
}

#[test]
fn test_year_with_exactly_threshold_rows_is_excluded() {
    let historical = fuel_prices_for_year(2021, MIN_ROWS_PER_YEAR as usize);
    let current = fuel_prices_for_year(2022, MIN_ROWS_PER_YEAR as usize + 1);

    let out = Normalizer::default()
        .clean_fuel_prices(current, historical)
        .unwrap();

    assert_eq!(out.height(), MIN_ROWS_PER_YEAR as usize + 1);
    assert_eq!(years(&out), vec![2022]);
}

#[test]
fn test_year_count_spans_both_files() {
    // 60 + 60 rows of the same year clear the threshold only once combined
    let historical = fuel_prices_for_year(2021, 60);
    let current = fuel_prices_for_year(2021, 60);

    let out = Normalizer::default()
        .clean_fuel_prices(current, historical)
        .unwrap();

    assert_eq!(out.height(), 120);
}

#[test]
fn test_unpriced_row_counts_toward_year_but_is_dropped() {
    let mut historical = fuel_prices_for_year(2021, MIN_ROWS_PER_YEAR as usize);
    let unpriced = df! {
        "fecha_vigencia" => &["2021-06-15"],
        "provincia" => &["SALTA"],
        "idproducto" => &["2"],
        "producto" => &["GNC"],
        "precio" => &["n/a"],
    }
    .unwrap();
    historical.vstack_mut(&unpriced).unwrap();

    let out = Normalizer::default()
        .clean_fuel_prices(empty_fuel_prices(), historical)
        .unwrap();

    assert_eq!(out.height(), MIN_ROWS_PER_YEAR as usize);
    assert_eq!(out.column(PRECIO_COMBUSTIBLES).unwrap().null_count(), 0);
}

#[test]
fn test_undated_row_does_not_count_toward_year() {
    let mut historical = fuel_prices_for_year(2021, MIN_ROWS_PER_YEAR as usize);
    let undated = df! {
        "fecha_vigencia" => &["sin fecha"],
        "provincia" => &["SALTA"],
        "idproducto" => &["2"],
        "producto" => &["GNC"],
        "precio" => &["120.0"],
    }
    .unwrap();
    historical.vstack_mut(&undated).unwrap();

    let out = Normalizer::default()
        .clean_fuel_prices(empty_fuel_prices(), historical)
        .unwrap();

    assert_eq!(out.height(), 0);
}

#[test]
fn test_product_and_mojibake_variant_share_canonical_label() {
    let rows = MIN_ROWS_PER_YEAR as usize + 1;
    let products: Vec<&str> = (0..rows)
        .map(|i| {
            if i % 2 == 0 {
                "Nafta (súper) entre 92 y 95 Ron"
            } else {
                "Nafta (sÃºper) entre 92 y 95 Ron"
            }
        })
        .collect();
    let historical = df! {
        "fecha_vigencia" => vec!["2023-03-01"; rows],
        "provincia" => vec![" CORDOBA "; rows],
        "idproducto" => vec!["2"; rows],
        "producto" => products,
        "precio" => vec!["200"; rows],
    }
    .unwrap();

    let out = Normalizer::default()
        .clean_fuel_prices(empty_fuel_prices(), historical)
        .unwrap();

    assert_eq!(out.height(), rows);
    assert!(str_values(&out, PRODUCTO)
        .iter()
        .all(|p| p == "Nafta Grado 2 (Súper)"));
    assert!(str_values(&out, PROVINCIA).iter().all(|p| p == "Córdoba"));
}

#[test]
fn test_historical_rows_come_first_even_when_later() {
    // historical file covers a later year than the current one
    let historical = fuel_prices_for_year(2023, 101);
    let current = fuel_prices_for_year(2021, 101);

    let out = Normalizer::default()
        .clean_fuel_prices(current, historical)
        .unwrap();

    assert_eq!(out.height(), 202);
    assert_eq!(years(&out), vec![2023, 2021]);
}

#[test]
fn test_row_order_is_kept_within_a_file() {
    let rows = MIN_ROWS_PER_YEAR as usize + 1;
    // dates run backwards through the year
    let dates: Vec<String> = (0..rows)
        .map(|i| format!("2022-{:02}-{:02}", 12 - i % 12, 28 - i % 28))
        .collect();
    let prices: Vec<String> = (0..rows).map(|i| format!("{i}.0")).collect();
    let historical = df! {
        "fecha_vigencia" => dates,
        "provincia" => vec!["SALTA"; rows],
        "idproducto" => vec!["1"; rows],
        "producto" => vec!["GNC"; rows],
        "precio" => prices,
    }
    .unwrap();

    let out = Normalizer::default()
        .clean_fuel_prices(empty_fuel_prices(), historical)
        .unwrap();

    let values: Vec<f64> = out
        .column(PRECIO_COMBUSTIBLES)
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect();
    let expected: Vec<f64> = (0..rows).map(|i| i as f64).collect();
    assert_eq!(values, expected);
}

#[test]
fn test_crude_oil_output_is_finite_and_complete() {
    let df = df! {
        "date" => &["2020-01-01", "2020-02-01", " 2020-03-01", "bad", "2020-05-01"],
        "value" => &["63.6", ".", "32.0", "40", "abc"],
    }
    .unwrap();

    let out = Normalizer::default().clean_crude_oil(df).unwrap();

    assert_eq!(out.height(), 2);
    let prices = out.column(PRECIO_CRUDO).unwrap().f64().unwrap();
    assert_eq!(prices.null_count(), 0);
    assert!(prices.into_no_null_iter().all(f64::is_finite));
    assert_eq!(out.column(FECHA).unwrap().null_count(), 0);
}

#[test]
fn test_currency_keeps_only_oficial_and_blue() {
    let df = df! {
        "casa" => &["oficial", "blue", "tarjeta", "mep"],
        "fecha" => &["2023-01-02", "2023-01-02", "2023-01-02", "2023-01-02"],
        "compra" => &[180.0, 350.0, 300.0, 340.0],
        "venta" => &[190.0, 360.0, 310.0, 345.0],
    }
    .unwrap();

    let out = Normalizer::default().clean_currency(df).unwrap();

    let mut kinds = str_values(&out, TIPO);
    kinds.sort();
    assert_eq!(kinds, vec!["blue", "oficial"]);
}

#[test]
fn test_fuel_sales_january_2016_dropped_regardless_of_values() {
    let df = df! {
        "indice_tiempo" => &["2016-01-01", "2016-01-31", "2015-12-01", "2017-01-01"],
        "provincia" => &["Salta", "Salta", "Salta", "Salta"],
        "sector" => &["comercial", "comercial", "comercial", "comercial"],
        "producto" => &["Gas Natural", "Gas Natural", "Gas Natural", "Gas Natural"],
        "total" => &["1", "2", "3", "4"],
        "unidad" => &["m3", "m3", "m3", "m3"],
    }
    .unwrap();

    let out = Normalizer::default().clean_fuel_sales(df).unwrap();

    assert_eq!(out.height(), 2);
    assert_eq!(
        out.get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>(),
        vec![FECHA, PROVINCIA, SECTOR, PRODUCTO, TOTAL, UNIDAD]
    );
}

#[test]
fn test_missing_fuel_price_column() {
    let current = df! { "fecha_vigencia" => &["2023-01-01"] }.unwrap();

    let err = Normalizer::default()
        .clean_fuel_prices(current, empty_fuel_prices())
        .unwrap_err();

    match err {
        EtlError::MissingColumn { origin, .. } => assert_eq!(origin, Source::FuelPricesCurrent),
        other => panic!("Expected MissingColumn, got {other:?}"),
    }
}
