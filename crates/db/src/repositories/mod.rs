//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod aggregation_repo;
pub mod catalog_repo;
pub mod extraction_repo;
pub mod poi_repo;
pub mod sample_repo;

pub use aggregation_repo::AggregationRepo;
pub use catalog_repo::SceneCatalogRepo;
pub use extraction_repo::ExtractionRepo;
pub use poi_repo::PoiRepo;
pub use sample_repo::SampleRepo;
