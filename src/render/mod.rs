pub mod canvas;
pub mod chart;
pub mod framebuffer;
pub mod marks;
pub mod overlay;
pub mod skeleton;
#[cfg(feature = "desktop")]
pub mod window;

pub use canvas::{Canvas, Color, Point};
pub use chart::{draw_series, ChartArea, LandmarkSeries};
pub use framebuffer::FrameBuffer;
pub use marks::ReferenceMarks;
pub use overlay::{OverlayFrame, OverlayOptions, OverlayRenderer};
pub use skeleton::SKELETON_CONNECTIONS;
#[cfg(feature = "desktop")]
pub use minifb::Key;
#[cfg(feature = "desktop")]
pub use window::MinifbRenderer;
