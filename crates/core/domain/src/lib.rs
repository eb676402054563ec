pub mod clock;
pub mod data;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use data::{Point, PointKind, TagValue};
pub use state::{ConnectionPhase, LinkEvent};
