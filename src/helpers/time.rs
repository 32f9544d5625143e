use std::time::Duration;

use chrono::{DateTime, Utc};

/// Non-negative time remaining until `instant`; zero once it has passed.
pub fn until(instant: DateTime<Utc>) -> Duration {
    (instant - Utc::now()).to_std().unwrap_or(Duration::ZERO)
}
