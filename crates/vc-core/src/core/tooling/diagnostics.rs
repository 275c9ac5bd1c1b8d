//! Stable diagnostic codes embedded in error messages and JSON envelopes.

pub const INVALID_NAME: &str = "VC400";
pub const NOT_FOUND: &str = "VC404";
pub const CONFLICT: &str = "VC409";
pub const CORRUPTION: &str = "VC500";
pub const INTERNAL: &str = "VC000";
