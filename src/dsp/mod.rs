pub mod auto_level;
pub mod decompose;
pub mod engine;
pub mod mixer;
pub mod pan_law;
pub mod ramp;
pub mod rotation;
pub mod utils;

pub use auto_level::AutoLevel;
pub use decompose::AxisComponents;
pub use engine::StereoEngine;
pub use mixer::{MixLevels, StereoMode};
pub use rotation::{AngleGainCache, AngleWatch, RotationGains, RotationKind};
