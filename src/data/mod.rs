/// Data layer: core types, loading, filtering, and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  header → schema, rows → MeasurementTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────────────┐
///   │ MeasurementTable  │  Vec<MeasurementRecord>, option index
///   └──────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  (state, county, material) → narrowed records
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  parse periods, group, mean → bar grid / line series
///   └───────────┘
/// ```

pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
pub mod period;
pub mod schema;
