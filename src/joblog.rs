//! The shared submission log
//!
//! One tab-separated line per submitted job, appended by every user of the tool. Nothing here ever
//! rewrites or removes a line.

/// Append submission records under an exclusive lock
pub mod record;
/// Advisory `flock` guard
pub mod lock;
/// Find records by job id
pub mod lookup;
