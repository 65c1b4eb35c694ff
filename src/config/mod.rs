//! Run configuration, loose-value parsing and the layered loader.

pub mod loader;
pub mod parse;
pub mod run;

pub use loader::ConfigLoader;
pub use run::RunConfig;
