//! Infrastructure Layer
//!
//! Collaborator implementations: PostgreSQL, in-memory and a logging mailer.

pub mod mailer;
pub mod memory;
pub mod postgres;

pub use mailer::LogMailer;
pub use memory::{MemoryDirectory, RecordingMailer};
pub use postgres::PgDirectory;
