pub mod camera;
pub mod config;
pub mod detection;
pub mod error;
pub mod history;
pub mod logging;
pub mod measurement;
pub mod pose;
pub mod render;

pub use error::{PoseError, Result};
