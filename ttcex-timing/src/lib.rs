pub mod clock;
pub mod scheduler;
pub mod timer;

pub use clock::FixedRateClock;
pub use scheduler::{ScheduleHandle, TickScheduler};
pub use timer::{CalibrationStats, HighPrecisionTimer, ManualTimer, Timer};
