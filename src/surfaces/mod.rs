pub mod discovery;
pub mod host;
pub mod scene;

pub use discovery::{is_eligible, Discovery, SurfaceRegistry, MIN_VISIBLE_PX};
pub use host::SurfaceHost;
pub use scene::SceneHost;
