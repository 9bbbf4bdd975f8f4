mod log_retention;

pub use log_retention::LogRetentionTask;
