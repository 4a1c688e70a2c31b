pub mod board;
pub mod elapsed;
pub mod lifecycle;
pub mod record;
pub mod ticker;

pub use elapsed::{compute_elapsed_seconds, format_elapsed};
pub use record::{TimerRecord, TimerStatus};
