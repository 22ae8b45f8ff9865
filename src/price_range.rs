// Price ranges for the bar chart
//
// Ten fixed half-open buckets. Bounds are contiguous so every
// non-negative price lands in exactly one bucket; the labels keep the
// dashboard's "101-200" style.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceRange {
    pub label: &'static str,
    /// Inclusive lower bound
    pub min: f64,
    /// Exclusive upper bound, `None` for the open-ended top bucket
    pub max: Option<f64>,
}

impl PriceRange {
    const fn bounded(label: &'static str, min: f64, max: f64) -> Self {
        Self {
            label,
            min,
            max: Some(max),
        }
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && self.max.map_or(true, |max| price < max)
    }
}

pub static PRICE_RANGES: [PriceRange; 10] = [
    PriceRange::bounded("0-100", 0.0, 100.0),
    PriceRange::bounded("101-200", 100.0, 200.0),
    PriceRange::bounded("201-300", 200.0, 300.0),
    PriceRange::bounded("301-400", 300.0, 400.0),
    PriceRange::bounded("401-500", 400.0, 500.0),
    PriceRange::bounded("501-600", 500.0, 600.0),
    PriceRange::bounded("601-700", 600.0, 700.0),
    PriceRange::bounded("701-800", 700.0, 800.0),
    PriceRange::bounded("801-900", 800.0, 900.0),
    PriceRange {
        label: "901-above",
        min: 900.0,
        max: None,
    },
];

/// Bucket a price falls into, if it is non-negative
pub fn bucket_for(price: f64) -> Option<&'static PriceRange> {
    PRICE_RANGES.iter().find(|range| range.contains(price))
}
