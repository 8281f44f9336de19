//! Configuration: the YAML jobs file and the duration parser it uses.

pub mod duration;
pub mod jobs;

pub use duration::parse_duration;
pub use jobs::{AuditConfig, JobsFile};
