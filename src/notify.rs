//! Job completion emails
//!
//! A decorated job script calls `submit notify` when it finishes. The message content is built
//! without side effects, delivery goes through an SMTP relay.

/// Build the email for a finished job
pub mod message;
/// Deliver the email over SMTP
pub mod send;
