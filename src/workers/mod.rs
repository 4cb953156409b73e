pub mod ingest;
pub mod reconciler;
