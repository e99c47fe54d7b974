//! Schema migration module
//!
//! Versioned SQL migrations for the public schema and every tenant schema,
//! driven by the `migrate` binary.

mod runner;
mod source;

pub use runner::{plan_down, plan_up, MigrateCommand, MigrateScope, Runner, SchemaVersion};
pub use source::{load_dir, Migration};
