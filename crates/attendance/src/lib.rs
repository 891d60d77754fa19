//! Attendance domain module (punch-in/out logs and day-end summaries).
//!
//! Days are UTC calendar days.

pub mod summary;
pub mod time_log;

pub use summary::{TimeSummary, WorkPolicy};
pub use time_log::{TimeLog, day_bounds};
