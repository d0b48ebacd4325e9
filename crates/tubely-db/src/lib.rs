//! Metadata store for video records.
//!
//! [`VideoRepository`] is the seam the ingestion pipeline and the API depend
//! on. Two implementations exist: Postgres for deployments and an in-memory
//! map for development and tests.

pub mod db;
pub mod memory;
pub mod traits;

pub use db::video::PgVideoRepository;
pub use db::{connect, run_migrations};
pub use memory::InMemoryVideoRepository;
pub use traits::VideoRepository;
