pub mod backend;
pub mod client;
pub mod protocol;

pub use backend::{AnalysisBackend, ReportService};
pub use client::{HttpBackend, DEFAULT_BACKEND_URL};
pub use protocol::{EndSessionResponse, FrameVerdict, ReportDescriptor};
