//! StereoCreator editor
//!
//! - `state`: editor model and events
//! - `components`: parameter rows and buttons
//! - `meters`: RMS level meters
//! - `layout`: top-level layout and the controller timer

pub mod components;
pub mod layout;
pub mod meters;
pub mod state;

pub use layout::build_ui;
