// Hookmap Event Model
// Key events, flag updates and the timestamps attached when forwarding

mod clock;
mod key_event;

pub use clock::{Clock, MonotonicClock, Timestamp};
pub use key_event::{EventError, EventType, KeyEvent, KeyboardType};
