//! Exit codes for the CLI

/// Success
#[allow(dead_code)]
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;
