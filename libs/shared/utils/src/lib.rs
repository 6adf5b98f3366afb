pub mod test_support;
pub mod time;

pub use time::{format_for_notification, ranges_overlap, Clock, FixedClock, SystemClock};
