// Staff-driven interaction core: targeting, force grab, foundation drawing,
// building relocation and the mode state machine tying them together.
pub mod building_move;
pub mod camera;
pub mod config;
pub mod constants;
pub mod foundation;
pub mod grab;
pub mod interaction;
pub mod math_utils;
pub mod plugin;
pub mod registry;
pub mod targeting;
pub mod terrain;
pub mod types;

pub use config::{InteractionConfig, ViewSettings};
pub use interaction::{StaffInteractionController, ViewContext};
pub use plugin::{InteractionSet, StaffInteractionPlugin, StaffView};
pub use registry::WorldObjects;
