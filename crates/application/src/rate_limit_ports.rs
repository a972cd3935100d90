//! Ports the admission use cases require from durable storage and time.

mod clock;
mod repositories;

pub use clock::{Clock, ManualClock, SystemClock};
pub use repositories::{ApiKeyRepository, SubjectStateRepository};
