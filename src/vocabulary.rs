//! Canonical product and province labels.
//!
//! Fuel-price files spell products and provinces differently from the
//! fuel-sales files, and some exports carry UTF-8 text that was decoded as
//! Latin-1 upstream ("sÃºper" instead of "súper"). Both tables map every
//! known variant to the label used by the fuel-sales relation, which is the
//! label the merger joins on. Unknown labels pass through unchanged.

use std::collections::HashMap;

use lazy_static::lazy_static;
use polars::prelude::*;

/// Product variants found in the fuel-price files.
pub const PRODUCT_VARIANTS: [(&str, &str); 7] = [
    ("GNC", "Gas Natural"),
    ("Gas Oil Grado 2", "Gasoil Grado 2 (Común)"),
    ("Gas Oil Grado 3", "Gasoil Grado 3"),
    ("Nafta (premium) de más de 95 Ron", "Nafta Grado 3 (Ultra)"),
    ("Nafta (súper) entre 92 y 95 Ron", "Nafta Grado 2 (Súper)"),
    // mis-encoded exports
    ("Nafta (premium) de mÃ¡s de 95 Ron", "Nafta Grado 3 (Ultra)"),
    ("Nafta (sÃºper) entre 92 y 95 Ron", "Nafta Grado 2 (Súper)"),
];

/// Upper-case province names used by the fuel-price files.
pub const PROVINCE_VARIANTS: [(&str, &str); 24] = [
    ("BUENOS AIRES", "Buenos Aires"),
    ("CAPITAL FEDERAL", "Capital Federal"),
    ("CORDOBA", "Córdoba"),
    ("LA PAMPA", "La Pampa"),
    ("SANTA FE", "Santa Fe"),
    ("TUCUMAN", "Tucuman"),
    ("SALTA", "Salta"),
    ("MENDOZA", "Mendoza"),
    ("NEUQUEN", "Neuquén"),
    ("SAN JUAN", "San Juan"),
    ("ENTRE RIOS", "Entre Rios"),
    ("JUJUY", "Jujuy"),
    ("SANTIAGO DEL ESTERO", "Santiago del Estero"),
    ("SAN LUIS", "San Luis"),
    ("CATAMARCA", "Catamarca"),
    ("CHACO", "Chaco"),
    ("CHUBUT", "Chubut"),
    ("CORRIENTES", "Corrientes"),
    ("FORMOSA", "Formosa"),
    ("LA RIOJA", "La Rioja"),
    ("MISIONES", "Misiones"),
    ("RIO NEGRO", "Rio Negro"),
    ("SANTA CRUZ", "Santa Cruz"),
    ("TIERRA DEL FUEGO", "Tierra del Fuego"),
];

lazy_static! {
    static ref PRODUCT_TABLE: HashMap<&'static str, &'static str> =
        PRODUCT_VARIANTS.iter().copied().collect();
    static ref PROVINCE_TABLE: HashMap<&'static str, &'static str> =
        PROVINCE_VARIANTS.iter().copied().collect();
}

/// Maps raw labels to canonical labels through two fixed lookup tables.
#[derive(Debug, Clone, Copy)]
pub struct VocabularyReconciler {
    products: &'static HashMap<&'static str, &'static str>,
    provinces: &'static HashMap<&'static str, &'static str>,
}

impl Default for VocabularyReconciler {
    fn default() -> Self {
        Self {
            products: &*PRODUCT_TABLE,
            provinces: &*PROVINCE_TABLE,
        }
    }
}

impl VocabularyReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn canonical_product<'a>(&self, label: &'a str) -> &'a str {
        self.products.get(label).copied().unwrap_or(label)
    }

    pub fn canonical_province<'a>(&self, label: &'a str) -> &'a str {
        self.provinces.get(label).copied().unwrap_or(label)
    }

    /// Expression rewriting `column` with the product table.
    pub fn product_expr(&self, column: &str) -> Expr {
        replace_labels(column, self.products)
    }

    /// Expression rewriting `column` with the province table.
    pub fn province_expr(&self, column: &str) -> Expr {
        replace_labels(column, self.provinces)
    }
}

/// Build a `when/then` chain that swaps every known variant for its canonical
/// label and keeps any other value as is.
fn replace_labels(column: &str, table: &HashMap<&'static str, &'static str>) -> Expr {
    // Sorted so the generated plan is identical between runs.
    let mut entries: Vec<(&str, &str)> = table.iter().map(|(k, v)| (*k, *v)).collect();
    entries.sort_unstable();

    entries
        .into_iter()
        .fold(col(column), |otherwise, (variant, canonical)| {
            when(col(column).eq(lit(variant)))
                .then(lit(canonical))
                .otherwise(otherwise)
        })
        .alias(column)
}
