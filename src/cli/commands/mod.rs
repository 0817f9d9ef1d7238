//! CLI command implementations
//!
//! Every command returns the process exit code:
//! 0 success, 1 messages failed, 2 configuration error, 3 run lock held,
//! 4 store connection error, 5 fatal error, 130 interrupted.

pub mod ingest;
pub mod init;
pub mod status;
pub mod validate;
