#[cfg(feature = "desktop")]
pub mod capture;
pub mod source;
#[cfg(feature = "desktop")]
pub mod video;

#[cfg(feature = "desktop")]
pub use capture::OpenCvCamera;
pub use source::{FrameSource, FrameStatus};
#[cfg(feature = "desktop")]
pub use video::{Playback, VideoFile};
