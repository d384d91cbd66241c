pub mod export;
pub mod ingest;

pub use export::ExportPipeline;
pub use ingest::{IngestPipeline, IngestSummary};
