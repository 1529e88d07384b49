//! Small helpers shared across the dashboard workspace.

pub mod env;
pub mod numeric;
