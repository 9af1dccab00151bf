pub mod fetcher;
pub mod pipeline;
pub mod reconciler;
pub mod record;
pub mod scheduler;
pub mod walker;

pub use fetcher::{build_fetch_requests, Fetcher};
pub use pipeline::Pipeline;
pub use reconciler::Reconciler;
pub use record::*;
pub use scheduler::{RefreshHandle, RefreshScheduler};
pub use walker::Walker;
