mod apply;
mod group;
mod misc;
mod plan;
mod render;
pub(crate) mod util;

pub use apply::Apply;
pub use group::Group;
pub use misc::Misc;
pub use plan::Plan;
pub use render::Render;
