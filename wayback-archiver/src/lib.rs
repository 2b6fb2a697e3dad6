pub mod error;
pub mod fetch;
pub mod index;
pub mod io;
pub mod mapper;
pub mod pipeline;
pub mod throttle;

// Integration-style tests with fixtures and a mock archive server
#[cfg(test)]
pub mod tests;

// Re-export key types and functions for easier access
pub use crate::error::{ArchiveError, ErrorKind};
pub use crate::fetch::{FetchedPage, Fetcher, HttpFetcher};
pub use crate::index::{convert_rows, load_records, read_index, write_index, IndexRecord};
pub use crate::mapper::{local_path, LocalPath, UrlMapper};
pub use crate::pipeline::{ArchiveSummary, Pipeline, PipelineConfig, StoredPage};
