/// Sources module
///
/// Defines the managed identity token source: one bounded-retry fetch
/// against the metadata endpoint named by the process environment.
pub mod managed_identity;
