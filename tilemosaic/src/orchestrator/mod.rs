//! Mosaic run orchestration.
//!
//! [`MosaicOrchestrator`] ties the other modules together: it turns each
//! boundary into a tile range, decides whether the cached mosaic can be
//! reused, fetches what is missing and assembles the result. State that must
//! survive between runs lives in [`SessionState`], which the caller owns.

mod error;
mod pipeline;
mod session;
mod types;

pub use error::MosaicError;
pub use pipeline::MosaicOrchestrator;
pub use session::{SessionState, SESSION_FILE_NAME};
pub use types::{
    BoundaryOutcome, BoundaryReport, BoundaryStatus, FailurePolicy, MosaicRequest,
    PipelineConfig, RunReport, ATTRIBUTION, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_TILES,
    DEFAULT_PARALLEL, DEFAULT_PREFIX, MAX_PARALLEL,
};
