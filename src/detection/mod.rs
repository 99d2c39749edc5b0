pub mod frame_rate;
pub mod runner;
pub mod state;
pub mod visibility;

pub use frame_rate::FrameRateCounter;
pub use runner::{DetectionLoop, LoopConfig, LoopMode, RunSummary, SkipReason, StopReason, TickOutcome};
pub use state::{ModelStatus, ViewerState};
pub use visibility::all_visible;
