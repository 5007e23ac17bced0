//! Static reference datasets sent to each client on connect.

use procura_core::{DemandPoint, Supplier};

const SUPPLIERS: &[(&str, f64, f64, f64)] = &[
    ("Ethiopia Coffee Cooperative", 6.16, 38.20, 9.1),
    ("Colombia Coffee Cooperative", 4.57, -75.67, 8.6),
    ("Brazil Coffee Cooperative", -21.23, -45.00, 7.8),
    ("Vietnam Coffee Cooperative", 12.67, 108.05, 7.1),
    ("Guatemala Coffee Cooperative", 14.56, -90.73, 8.4),
    ("Costa Rica Coffee Cooperative", 9.93, -84.08, 8.9),
    ("Kenya Coffee Cooperative", -0.42, 36.95, 9.0),
    ("Indonesia Coffee Cooperative", 3.60, 98.67, 7.6),
];

const DEMAND_FORECAST: &[(&str, u32)] = &[
    ("Jan", 120),
    ("Feb", 115),
    ("Mar", 125),
    ("Apr", 130),
    ("May", 128),
    ("Jun", 122),
    ("Jul", 118),
    ("Aug", 121),
    ("Sep", 134),
    ("Oct", 142),
    ("Nov", 150),
    ("Dec", 165),
];

/// Supplier reference list.
pub fn suppliers() -> Vec<Supplier> {
    SUPPLIERS
        .iter()
        .map(|&(name, lat, lon, quality)| Supplier {
            name: name.to_string(),
            lat,
            lon,
            quality,
        })
        .collect()
}

/// Twelve-month demand forecast, thousands of pounds per month.
pub fn demand_forecast() -> Vec<DemandPoint> {
    DEMAND_FORECAST
        .iter()
        .map(|&(month, demand)| DemandPoint {
            month: month.to_string(),
            demand,
        })
        .collect()
}
