//! Transform benchmarks.
//!
//! Measures:
//! - Monthly aggregation over daily fuel-price rows
//! - Fuel-price normalization with label canonicalization
//! - The full transform on synthetic raw relations

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fuel_market_etl::pipeline::TransformPipeline;
use fuel_market_etl::types::*;
use fuel_market_etl::{aggregate_monthly, Normalizer};
use polars::prelude::*;

const PROVINCES: [&str; 4] = ["BUENOS AIRES", "CORDOBA", "SANTA FE", "MENDOZA"];
const PRODUCTS: [&str; 4] = [
    "GNC",
    "Gas Oil Grado 2",
    "Nafta (súper) entre 92 y 95 Ron",
    "Nafta (premium) de más de 95 Ron",
];

fn date_string(i: usize) -> String {
    format!("{}-{:02}-{:02}", 2018 + (i / 336) % 6, (i / 28) % 12 + 1, i % 28 + 1)
}

fn raw_fuel_prices(rows: usize) -> DataFrame {
    df! {
        "fecha_vigencia" => (0..rows).map(date_string).collect::<Vec<_>>(),
        "provincia" => (0..rows).map(|i| PROVINCES[i % PROVINCES.len()]).collect::<Vec<_>>(),
        "idproducto" => (0..rows).map(|i| (i % PRODUCTS.len()).to_string()).collect::<Vec<_>>(),
        "producto" => (0..rows).map(|i| PRODUCTS[(i / 7) % PRODUCTS.len()]).collect::<Vec<_>>(),
        "precio" => (0..rows).map(|i| format!("{:.2}", 100.0 + (i % 500) as f64)).collect::<Vec<_>>(),
    }
    .unwrap()
}

fn raw_sources(rows: usize) -> RawSources {
    let months: Vec<String> = (0..72)
        .map(|m| format!("{}-{:02}-01", 2018 + m / 12, m % 12 + 1))
        .collect();
    let sales_rows = months.len() * PROVINCES.len();

    RawSources::builder()
        .crude_oil(
            df! {
                "date" => months.clone(),
                "value" => (0..months.len()).map(|i| format!("{}", 60 + i % 30)).collect::<Vec<_>>(),
            }
            .unwrap(),
        )
        .currency(
            df! {
                "casa" => (0..rows).map(|i| if i % 2 == 0 { "oficial" } else { "blue" }).collect::<Vec<_>>(),
                "fecha" => (0..rows).map(date_string).collect::<Vec<_>>(),
                "compra" => vec![100.0; rows],
                "venta" => vec![105.0; rows],
            }
            .unwrap(),
        )
        .fuel_prices_historical(raw_fuel_prices(rows))
        .fuel_prices_current(raw_fuel_prices(rows / 10))
        .fuel_sales(
            df! {
                "indice_tiempo" => (0..sales_rows).map(|i| months[i / PROVINCES.len()].clone()).collect::<Vec<_>>(),
                "provincia" => (0..sales_rows).map(|i| ["Buenos Aires", "Córdoba", "Santa Fe", "Mendoza"][i % 4]).collect::<Vec<_>>(),
                "sector" => vec!["comercial"; sales_rows],
                "producto" => vec!["Nafta Grado 2 (Súper)"; sales_rows],
                "total" => vec!["1000"; sales_rows],
                "unidad" => vec!["litros"; sales_rows],
            }
            .unwrap(),
        )
        .build()
        .unwrap()
}

fn bench_aggregate_monthly(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate_monthly");

    for rows in [1_000usize, 10_000, 100_000] {
        let clean = Normalizer::default()
            .clean_fuel_prices(raw_fuel_prices(rows), raw_fuel_prices(0))
            .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(rows), &clean, |b, clean| {
            b.iter(|| {
                aggregate_monthly(
                    black_box(clean.clone()),
                    FECHA,
                    &[PRECIO_COMBUSTIBLES],
                    &[PRODUCTO, PROVINCIA],
                )
                .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_clean_fuel_prices(c: &mut Criterion) {
    let raw = raw_fuel_prices(50_000);
    let normalizer = Normalizer::default();

    c.bench_function("clean_fuel_prices_50k", |b| {
        b.iter(|| {
            normalizer
                .clean_fuel_prices(black_box(raw.clone()), raw_fuel_prices(0))
                .unwrap()
        })
    });
}

fn bench_full_transform(c: &mut Criterion) {
    let raw = raw_sources(20_000);
    let pipeline = TransformPipeline::default();

    c.bench_function("full_transform_20k", |b| {
        b.iter(|| pipeline.run(black_box(raw.clone())).unwrap())
    });
}

criterion_group!(
    benches,
    bench_aggregate_monthly,
    bench_clean_fuel_prices,
    bench_full_transform,
);

criterion_main!(benches);
