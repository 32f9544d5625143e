//! Scenario tests exercising the fetch operation, the refresh loop, and
//! the configuration surface.

#[cfg(test)]
pub mod common;
