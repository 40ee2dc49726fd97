pub mod duckdb;
pub mod tracker;
pub mod traits;

pub use tracker::Tracker;
pub use traits::{Partition, ProcessedObject, StoreError, TrackingStore};
