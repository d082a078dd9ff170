/// Data layer: core types, loading, validation, filtering and statistics.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset (nulls filled with 0)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐         ┌──────────┐
///   │  Dataset  │ ◄────── │  schema   │  JSON payload → Entry
///   └──────────┘         └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌──────────┐   ┌──────────┐
///   │  filter   │   │  stats    │  PM25 count / mean / min / max
///   └──────────┘   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod schema;
pub mod stats;
