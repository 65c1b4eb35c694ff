//! Transport backends.

pub mod memory;

pub use memory::{RecordedSubmission, ScriptedTransport};
