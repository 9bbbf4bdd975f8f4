//! Command handlers for CLI operations
//!
//! Each handler owns the logic of one subcommand, separate from parsing.

pub mod jobs;
pub mod next;
pub mod run;
pub mod serve;

pub use jobs::JobsCommandHandler;
pub use next::NextCommandHandler;
pub use run::RunCommandHandler;
pub use serve::ServeCommandHandler;
