pub mod config;
pub mod device;
pub mod error;
pub mod event_bus;
pub mod types;

pub use config::AppConfig;
pub use error::{SmileError, SmileResult};
pub use types::{DeviceClass, Profile, ScoredSegment, SegmentMatch};
