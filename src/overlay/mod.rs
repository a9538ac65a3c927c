pub mod renderer;
pub mod sink;
pub mod state;

pub use renderer::OverlayRenderer;
pub use sink::{LogSink, OverlaySink, StdoutSink};
pub use state::OverlayState;
