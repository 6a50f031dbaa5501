pub mod classify;
pub mod client;
pub mod iter;
pub mod multipart;
pub mod upload;
pub mod walk;

pub use iter::SyncFolderIter;
pub use upload::{BatchSummary, BatchUploader, DryRunUploader, S3BatchUploader};
