pub mod context;
pub mod controller;
pub mod loop_worker;
pub mod state;

pub use context::{CycleContext, CycleSettings};
pub use controller::{CycleController, ALREADY_RUNNING, HOST_UNAVAILABLE, NO_PARTICIPANTS};
pub use state::{CycleState, CycleStatus};
