#[cfg(feature = "desktop")]
pub mod detector;
pub mod estimator;
pub mod keypoint;
#[cfg(feature = "desktop")]
pub mod preprocess;

#[cfg(feature = "desktop")]
pub use detector::{MoveNetEstimator, MoveNetLoader, PoseDetector};
pub use estimator::{EstimateOptions, EstimatorLoader, PoseEstimator};
pub use keypoint::{Keypoint, KeypointIndex, Pose};
#[cfg(feature = "desktop")]
pub use preprocess::preprocess_for_movenet;
