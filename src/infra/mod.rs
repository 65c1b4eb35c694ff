//! Infrastructure adapters for the platform transport.

pub mod transport;

pub use transport::{RecordedSubmission, ScriptedTransport};
