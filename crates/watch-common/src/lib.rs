//! Common types shared across the hls-watch crates.

pub mod bbox;
pub mod error;
pub mod event;
pub mod mgrs;
pub mod region;

pub use bbox::BoundingBox;
pub use error::{WatchError, WatchResult};
pub use event::{TrackerEvent, EVENT_TYPE_HLS};
pub use mgrs::locate;
pub use region::TrackedRegion;
