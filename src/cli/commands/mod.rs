//! CLI command implementations
//!
//! Exit codes: 0 success, 1 export failed, 2 configuration or input error,
//! 5 fatal error.

pub mod export;
pub mod status;
pub mod validate;
